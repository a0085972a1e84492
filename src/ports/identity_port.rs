//! Subject identity port trait.

use crate::domain::error::AbTestError;

pub trait IdentityPort {
    /// Returns the subject id for this context, creating it on first use.
    /// Stable across calls against the same persisted store.
    fn subject_id(&self) -> Result<String, AbTestError>;
}
