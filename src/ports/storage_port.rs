//! Key-value persistence port trait.

use crate::domain::error::AbTestError;

/// String key-value store scoped to one execution context.
///
/// The engine serializes its state to JSON before calling [`StoragePort::set`].
pub trait StoragePort: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AbTestError>;

    fn set(&self, key: &str, value: &str) -> Result<(), AbTestError>;

    fn remove(&self, key: &str) -> Result<(), AbTestError>;
}
