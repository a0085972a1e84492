//! Sticky subject-to-variant assignments and their persistence.

use crate::domain::error::AbTestError;
use crate::ports::diagnostics_port::DiagnosticsPort;
use crate::ports::storage_port::StoragePort;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub const ASSIGNMENTS_KEY: &str = "ab_test_assignments";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub subject_id: String,
    pub experiment_name: String,
    pub variant: String,
    pub assigned_at: DateTime<Utc>,
}

type AssignmentKey = (String, String);

/// Storage-backed set of assignments, at most one per (subject, experiment).
///
/// The persisted list is read once on first access and cached; every new
/// assignment rewrites the whole list.
pub struct AssignmentStore {
    storage: Arc<dyn StoragePort>,
    diagnostics: Arc<dyn DiagnosticsPort>,
    cache: Option<Cache>,
}

#[derive(Default)]
struct Cache {
    index: HashMap<AssignmentKey, usize>,
    entries: Vec<Assignment>,
}

impl AssignmentStore {
    pub fn new(storage: Arc<dyn StoragePort>, diagnostics: Arc<dyn DiagnosticsPort>) -> Self {
        Self {
            storage,
            diagnostics,
            cache: None,
        }
    }

    pub fn get(&mut self, subject_id: &str, experiment_name: &str) -> Option<&Assignment> {
        let cache = self.load();
        cache
            .index
            .get(&(subject_id.to_string(), experiment_name.to_string()))
            .map(|&i| &cache.entries[i])
    }

    /// All assignments in creation order.
    pub fn all(&mut self) -> &[Assignment] {
        &self.load().entries
    }

    /// Stores `assignment` unless the pair is already assigned, in which case
    /// the existing binding is returned untouched.
    pub fn insert(&mut self, assignment: Assignment) -> &Assignment {
        let key = (
            assignment.subject_id.clone(),
            assignment.experiment_name.clone(),
        );
        let existing = self.load().index.get(&key).copied();
        let i = match existing {
            Some(i) => i,
            None => {
                let cache = self.load_cached();
                let i = cache.entries.len();
                cache.index.insert(key, i);
                cache.entries.push(assignment);
                self.persist();
                i
            }
        };
        &self.load_cached().entries[i]
    }

    pub fn clear(&mut self) {
        self.cache = Some(Cache::default());
        if let Err(e) = self.storage.remove(ASSIGNMENTS_KEY) {
            self.diagnostics.warn(&e);
        }
    }

    fn load(&mut self) -> &mut Cache {
        if self.cache.is_none() {
            let entries = read_assignments(self.storage.as_ref(), self.diagnostics.as_ref());
            let mut cache = Cache::default();
            for entry in entries {
                let key = (entry.subject_id.clone(), entry.experiment_name.clone());
                if cache.index.contains_key(&key) {
                    continue;
                }
                cache.index.insert(key, cache.entries.len());
                cache.entries.push(entry);
            }
            self.cache = Some(cache);
        }
        self.load_cached()
    }

    fn load_cached(&mut self) -> &mut Cache {
        self.cache.get_or_insert_with(Cache::default)
    }

    fn persist(&self) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let result = serde_json::to_string(&cache.entries)
            .map_err(AbTestError::from)
            .and_then(|json| self.storage.set(ASSIGNMENTS_KEY, &json));
        if let Err(e) = result {
            self.diagnostics.warn(&e);
        }
    }
}

/// Reads the persisted assignment list, treating unreadable state as empty.
fn read_assignments(storage: &dyn StoragePort, diagnostics: &dyn DiagnosticsPort) -> Vec<Assignment> {
    match storage.get(ASSIGNMENTS_KEY) {
        Ok(None) => Vec::new(),
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            diagnostics.warn(&AbTestError::MalformedState {
                key: ASSIGNMENTS_KEY.to_string(),
                reason: e.to_string(),
            });
            Vec::new()
        }),
        Err(e) => {
            diagnostics.warn(&e);
            Vec::new()
        }
    }
}
