//! Port traits: the boundaries between the engine and its environment.

pub mod collector_port;
pub mod config_port;
pub mod diagnostics_port;
pub mod identity_port;
pub mod report_port;
pub mod storage_port;
