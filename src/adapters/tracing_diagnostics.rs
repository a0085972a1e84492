//! Default diagnostics hook: every recovered condition becomes a `tracing`
//! warning.

use crate::domain::error::AbTestError;
use crate::ports::diagnostics_port::DiagnosticsPort;
use tracing::warn;

pub struct TracingDiagnostics;

impl DiagnosticsPort for TracingDiagnostics {
    fn warn(&self, condition: &AbTestError) {
        match condition {
            AbTestError::UnknownExperiment { name } => {
                warn!(experiment = %name, "unknown experiment, using default variant");
            }
            AbTestError::UnassignedSubject {
                subject_id,
                experiment,
            } => {
                warn!(subject = %subject_id, experiment = %experiment, "dropping event for unassigned subject");
            }
            AbTestError::RemoteDelivery { path, reason } => {
                warn!(path = %path, reason = %reason, "collector delivery failed");
            }
            AbTestError::MalformedState { key, reason } => {
                warn!(key = %key, reason = %reason, "discarding malformed persisted state");
            }
            other => warn!("{other}"),
        }
    }
}
