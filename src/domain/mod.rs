//! Core domain types and logic.

pub mod aggregate;
pub mod assignment;
pub mod config_validation;
pub mod context;
pub mod error;
pub mod event;
pub mod experiment;
pub mod recorder;
pub mod report;
pub mod significance;
