//! In-memory adapters for storage, the collector, and diagnostics.

use crate::domain::error::AbTestError;
use crate::ports::collector_port::CollectorPort;
use crate::ports::diagnostics_port::DiagnosticsPort;
use crate::ports::storage_port::StoragePort;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl StoragePort for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AbTestError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AbTestError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AbTestError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Discards every payload.
pub struct NoopCollector;

impl CollectorPort for NoopCollector {
    fn send(&self, _path: &str, _payload: &serde_json::Value) -> Result<(), AbTestError> {
        Ok(())
    }
}

/// Keeps every delivered payload; can be switched to fail all deliveries.
#[derive(Default)]
pub struct MemoryCollector {
    sent: Mutex<Vec<(String, serde_json::Value)>>,
    failure: Mutex<Option<String>>,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, reason: &str) {
        *lock(&self.failure) = Some(reason.to_string());
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    pub fn sent(&self) -> Vec<(String, serde_json::Value)> {
        lock(&self.sent).clone()
    }
}

impl CollectorPort for MemoryCollector {
    fn send(&self, path: &str, payload: &serde_json::Value) -> Result<(), AbTestError> {
        if let Some(reason) = lock(&self.failure).clone() {
            return Err(AbTestError::RemoteDelivery {
                path: path.to_string(),
                reason,
            });
        }
        lock(&self.sent).push((path.to_string(), payload.clone()));
        Ok(())
    }
}

/// Records the rendered message of every reported condition.
#[derive(Default)]
pub struct MemoryDiagnostics {
    warnings: Mutex<Vec<String>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }
}

impl DiagnosticsPort for MemoryDiagnostics {
    fn warn(&self, condition: &AbTestError) {
        lock(&self.warnings).push(condition.to_string());
    }
}
