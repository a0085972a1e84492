//! Append-only event log with best-effort forwarding to a collector.

use crate::domain::assignment::AssignmentStore;
use crate::domain::error::AbTestError;
use crate::domain::event::{Event, EventKind};
use crate::ports::collector_port::{
    ASSIGNMENT_PATH, CONVERSION_PATH, CollectorPort, EVENT_PATH,
};
use crate::ports::diagnostics_port::DiagnosticsPort;
use crate::ports::storage_port::StoragePort;
use std::sync::Arc;

pub const EVENTS_KEY: &str = "ab_test_events";

/// Owns the event log. Local append always happens before the forward, and a
/// failed forward never undoes it.
pub struct EventRecorder {
    storage: Arc<dyn StoragePort>,
    collector: Arc<dyn CollectorPort>,
    diagnostics: Arc<dyn DiagnosticsPort>,
    events: Option<Vec<Event>>,
}

impl EventRecorder {
    pub fn new(
        storage: Arc<dyn StoragePort>,
        collector: Arc<dyn CollectorPort>,
        diagnostics: Arc<dyn DiagnosticsPort>,
    ) -> Self {
        Self {
            storage,
            collector,
            diagnostics,
            events: None,
        }
    }

    pub fn record_assignment(&mut self, subject_id: &str, experiment_name: &str, variant: &str) {
        self.append(Event::assignment(subject_id, experiment_name, variant));
    }

    /// Appends a conversion against the subject's assigned variant. Dropped
    /// with a warning when the subject was never assigned.
    pub fn record_conversion(
        &mut self,
        assignments: &mut AssignmentStore,
        subject_id: &str,
        experiment_name: &str,
        conversion_type: &str,
        value: f64,
    ) {
        let Some(variant) = self.assigned_variant(assignments, subject_id, experiment_name) else {
            return;
        };
        self.append(Event::conversion(
            subject_id,
            experiment_name,
            &variant,
            conversion_type,
            value,
        ));
    }

    /// Appends a custom event against the subject's assigned variant. Dropped
    /// with a warning when the subject was never assigned.
    pub fn record_event(
        &mut self,
        assignments: &mut AssignmentStore,
        subject_id: &str,
        experiment_name: &str,
        event_name: &str,
        data: serde_json::Value,
    ) {
        let Some(variant) = self.assigned_variant(assignments, subject_id, experiment_name) else {
            return;
        };
        self.append(Event::custom(
            subject_id,
            experiment_name,
            &variant,
            event_name,
            data,
        ));
    }

    /// The full log in append order.
    pub fn events(&mut self) -> &[Event] {
        self.load()
    }

    pub fn clear(&mut self) {
        self.events = Some(Vec::new());
        if let Err(e) = self.storage.remove(EVENTS_KEY) {
            self.diagnostics.warn(&e);
        }
    }

    fn assigned_variant(
        &self,
        assignments: &mut AssignmentStore,
        subject_id: &str,
        experiment_name: &str,
    ) -> Option<String> {
        let variant = assignments
            .get(subject_id, experiment_name)
            .map(|a| a.variant.clone());
        if variant.is_none() {
            self.diagnostics.warn(&AbTestError::UnassignedSubject {
                subject_id: subject_id.to_string(),
                experiment: experiment_name.to_string(),
            });
        }
        variant
    }

    fn append(&mut self, event: Event) {
        let payload = serde_json::to_value(&event);
        let path = collector_path(&event.kind);

        self.load().push(event);
        self.persist();

        let result = payload
            .map_err(AbTestError::from)
            .and_then(|payload| self.collector.send(path, &payload));
        if let Err(e) = result {
            let condition = if matches!(e, AbTestError::RemoteDelivery { .. }) {
                e
            } else {
                AbTestError::RemoteDelivery {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            };
            self.diagnostics.warn(&condition);
        }
    }

    fn load(&mut self) -> &mut Vec<Event> {
        if self.events.is_none() {
            self.events = Some(read_events(
                self.storage.as_ref(),
                self.diagnostics.as_ref(),
            ));
        }
        self.events.get_or_insert_with(Vec::new)
    }

    fn persist(&self) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let result = serde_json::to_string(events)
            .map_err(AbTestError::from)
            .and_then(|json| self.storage.set(EVENTS_KEY, &json));
        if let Err(e) = result {
            self.diagnostics.warn(&e);
        }
    }
}

fn collector_path(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Assignment => ASSIGNMENT_PATH,
        EventKind::Conversion { .. } => CONVERSION_PATH,
        EventKind::Custom { .. } => EVENT_PATH,
    }
}

/// Reads the persisted log, treating unreadable state as an empty log.
fn read_events(storage: &dyn StoragePort, diagnostics: &dyn DiagnosticsPort) -> Vec<Event> {
    match storage.get(EVENTS_KEY) {
        Ok(None) => Vec::new(),
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            diagnostics.warn(&AbTestError::MalformedState {
                key: EVENTS_KEY.to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_adapter::{MemoryCollector, MemoryDiagnostics, MemoryStore};
    use crate::domain::assignment::Assignment;
    use chrono::Utc;
    use serde_json::json;

    struct Fixture {
        storage: Arc<MemoryStore>,
        collector: Arc<MemoryCollector>,
        diagnostics: Arc<MemoryDiagnostics>,
        recorder: EventRecorder,
        assignments: AssignmentStore,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStore::new());
        let collector = Arc::new(MemoryCollector::new());
        let diagnostics = Arc::new(MemoryDiagnostics::new());
        let recorder = EventRecorder::new(storage.clone(), collector.clone(), diagnostics.clone());
        let assignments = AssignmentStore::new(storage.clone(), diagnostics.clone());
        Fixture {
            storage,
            collector,
            diagnostics,
            recorder,
            assignments,
        }
    }

    fn assign(fx: &mut Fixture, subject: &str, experiment: &str, variant: &str) {
        fx.assignments.insert(Assignment {
            subject_id: subject.into(),
            experiment_name: experiment.into(),
            variant: variant.into(),
            assigned_at: Utc::now(),
        });
    }

    #[test]
    fn record_assignment_appends_and_forwards() {
        let mut fx = fixture();
        fx.recorder.record_assignment("u1", "hero", "B");

        assert_eq!(fx.recorder.events().len(), 1);
        let sent = fx.collector.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ASSIGNMENT_PATH);
        assert_eq!(sent[0].1["variant"], "B");
        assert_eq!(sent[0].1["type"], "assignment");
    }

    #[test]
    fn conversion_without_assignment_is_dropped() {
        let mut fx = fixture();
        fx.recorder
            .record_conversion(&mut fx.assignments, "u1", "hero", "purchase", 10.0);

        assert!(fx.recorder.events().is_empty());
        assert!(fx.collector.sent().is_empty());
        assert_eq!(
            fx.diagnostics.warnings(),
            vec!["subject u1 has no assignment for experiment hero".to_string()]
        );
    }

    #[test]
    fn custom_event_without_assignment_is_dropped() {
        let mut fx = fixture();
        fx.recorder
            .record_event(&mut fx.assignments, "u1", "hero", "click", json!({}));
        assert!(fx.recorder.events().is_empty());
        assert_eq!(fx.diagnostics.warnings().len(), 1);
    }

    #[test]
    fn conversion_uses_assigned_variant() {
        let mut fx = fixture();
        assign(&mut fx, "u1", "hero", "B");
        fx.recorder
            .record_conversion(&mut fx.assignments, "u1", "hero", "purchase", 25.0);

        let events = fx.recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].variant, "B");
        assert_eq!(
            events[0].kind,
            EventKind::Conversion {
                conversion_type: "purchase".into(),
                value: 25.0
            }
        );
        assert_eq!(fx.collector.sent()[0].0, CONVERSION_PATH);
    }

    #[test]
    fn events_preserve_call_order() {
        let mut fx = fixture();
        assign(&mut fx, "u1", "hero", "A");
        fx.recorder.record_assignment("u1", "hero", "A");
        fx.recorder
            .record_event(&mut fx.assignments, "u1", "hero", "first", json!(1));
        fx.recorder
            .record_event(&mut fx.assignments, "u1", "hero", "second", json!(2));
        fx.recorder
            .record_conversion(&mut fx.assignments, "u1", "hero", "signup", 0.0);

        let kinds: Vec<&str> = fx.recorder.events().iter().map(|e| e.kind.label()).collect();
        assert_eq!(kinds, vec!["assignment", "custom", "custom", "conversion"]);
        let paths: Vec<String> = fx.collector.sent().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![ASSIGNMENT_PATH, EVENT_PATH, EVENT_PATH, CONVERSION_PATH]
        );
    }

    #[test]
    fn collector_failure_keeps_local_event() {
        let mut fx = fixture();
        fx.collector.fail_with("connection refused");
        fx.recorder.record_assignment("u1", "hero", "A");

        assert_eq!(fx.recorder.events().len(), 1);
        let warnings = fx.diagnostics.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0],
            "remote delivery to /api/ab-test/assignment failed: connection refused"
        );
    }

    #[test]
    fn log_survives_a_new_recorder() {
        let mut fx = fixture();
        fx.recorder.record_assignment("u1", "hero", "A");
        fx.recorder.record_assignment("u2", "hero", "B");

        let mut reopened = EventRecorder::new(
            fx.storage.clone(),
            fx.collector.clone(),
            fx.diagnostics.clone(),
        );
        let variants: Vec<&str> = reopened.events().iter().map(|e| e.variant.as_str()).collect();
        assert_eq!(variants, vec!["A", "B"]);
    }

    #[test]
    fn malformed_log_reads_as_empty_and_recovers() {
        let mut fx = fixture();
        fx.storage.set(EVENTS_KEY, "[{\"broken\": ").unwrap();

        assert!(fx.recorder.events().is_empty());
        assert_eq!(fx.diagnostics.warnings().len(), 1);

        fx.recorder.record_assignment("u1", "hero", "A");
        let stored = fx.storage.get(EVENTS_KEY).unwrap().unwrap();
        let parsed: Vec<Event> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn clear_empties_log() {
        let mut fx = fixture();
        fx.recorder.record_assignment("u1", "hero", "A");
        fx.recorder.clear();
        assert!(fx.recorder.events().is_empty());
        assert_eq!(fx.storage.get(EVENTS_KEY).unwrap(), None);
    }
}
