//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http")]
pub mod http_collector;
pub mod memory_adapter;
pub mod report_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod stored_identity;
pub mod tracing_diagnostics;
