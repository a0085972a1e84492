//! Failure hook for conditions the engine recovers from locally.

use crate::domain::error::AbTestError;

pub trait DiagnosticsPort: Send + Sync {
    fn warn(&self, condition: &AbTestError);
}
