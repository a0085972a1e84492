//! Domain error types.
//!
//! The first four variants are the engine's recoverable conditions. They are
//! never returned from the core operations; the context reports them to the
//! [`DiagnosticsPort`](crate::ports::diagnostics_port::DiagnosticsPort) and
//! degrades instead.

/// Top-level error type for abtest.
#[derive(Debug, thiserror::Error)]
pub enum AbTestError {
    #[error("unknown experiment: {name}")]
    UnknownExperiment { name: String },

    #[error("subject {subject_id} has no assignment for experiment {experiment}")]
    UnassignedSubject {
        subject_id: String,
        experiment: String,
    },

    #[error("remote delivery to {path} failed: {reason}")]
    RemoteDelivery { path: String, reason: String },

    #[error("malformed persisted state under {key}: {reason}")]
    MalformedState { key: String, reason: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AbTestError {
    pub fn storage(reason: impl ToString) -> Self {
        AbTestError::Storage {
            reason: reason.to_string(),
        }
    }
}

impl From<&AbTestError> for std::process::ExitCode {
    fn from(err: &AbTestError) -> Self {
        let code: u8 = match err {
            AbTestError::Io(_) => 1,
            AbTestError::ConfigParse { .. }
            | AbTestError::ConfigMissing { .. }
            | AbTestError::ConfigInvalid { .. } => 2,
            AbTestError::Storage { .. } | AbTestError::MalformedState { .. } => 3,
            AbTestError::UnknownExperiment { .. }
            | AbTestError::UnassignedSubject { .. }
            | AbTestError::RemoteDelivery { .. } => 4,
            AbTestError::Serialization(_) | AbTestError::Csv(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
