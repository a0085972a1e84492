//! Remote event collector port trait.

use crate::domain::error::AbTestError;

pub const ASSIGNMENT_PATH: &str = "/api/ab-test/assignment";
pub const CONVERSION_PATH: &str = "/api/ab-test/conversion";
pub const EVENT_PATH: &str = "/api/ab-test/event";

/// Sink for recorded events.
///
/// Delivery is advisory: implementations must not block on the remote side,
/// and callers only log a returned error.
pub trait CollectorPort: Send + Sync {
    fn send(&self, path: &str, payload: &serde_json::Value) -> Result<(), AbTestError>;
}
