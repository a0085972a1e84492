//! The experiment context: assignment service, event recorder and analyzer
//! behind one explicitly constructed object.

use crate::domain::assignment::{Assignment, AssignmentStore};
use crate::domain::error::AbTestError;
use crate::domain::event::Event;
use crate::domain::experiment::ExperimentRegistry;
use crate::domain::recorder::EventRecorder;
use crate::domain::report::{ExperimentReport, build_reports};
use crate::ports::collector_port::CollectorPort;
use crate::ports::diagnostics_port::DiagnosticsPort;
use crate::ports::storage_port::StoragePort;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Arc;

pub const DEFAULT_VARIANT: &str = "A";

pub struct ExperimentContext {
    registry: ExperimentRegistry,
    assignments: AssignmentStore,
    recorder: EventRecorder,
    diagnostics: Arc<dyn DiagnosticsPort>,
    rng: Box<dyn RngCore + Send>,
    default_variant: String,
}

impl ExperimentContext {
    pub fn new(
        registry: ExperimentRegistry,
        storage: Arc<dyn StoragePort>,
        collector: Arc<dyn CollectorPort>,
        diagnostics: Arc<dyn DiagnosticsPort>,
    ) -> Self {
        Self {
            registry,
            assignments: AssignmentStore::new(storage.clone(), diagnostics.clone()),
            recorder: EventRecorder::new(storage, collector, diagnostics.clone()),
            diagnostics,
            rng: Box::new(StdRng::from_entropy()),
            default_variant: DEFAULT_VARIANT.to_string(),
        }
    }

    /// Replaces the random source used for new assignments.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Label returned for experiments missing from the registry.
    pub fn with_default_variant(mut self, label: &str) -> Self {
        self.default_variant = label.to_string();
        self
    }

    pub fn registry(&self) -> &ExperimentRegistry {
        &self.registry
    }

    /// Returns the subject's variant, assigning one on first call.
    ///
    /// A new assignment is persisted and recorded as an assignment event.
    /// Unknown experiments yield the default variant and record nothing.
    pub fn get_variant(&mut self, subject_id: &str, experiment_name: &str) -> String {
        let Some(experiment) = self.registry.get(experiment_name) else {
            self.diagnostics.warn(&AbTestError::UnknownExperiment {
                name: experiment_name.to_string(),
            });
            return self.default_variant.clone();
        };

        if let Some(existing) = self.assignments.get(subject_id, experiment_name) {
            return existing.variant.clone();
        }

        let r: f64 = self.rng.gen_range(0.0..1.0);
        let variant = experiment.select(r).to_string();

        self.assignments.insert(Assignment {
            subject_id: subject_id.to_string(),
            experiment_name: experiment_name.to_string(),
            variant: variant.clone(),
            assigned_at: Utc::now(),
        });
        self.recorder
            .record_assignment(subject_id, experiment_name, &variant);
        variant
    }

    pub fn assignment(&mut self, subject_id: &str, experiment_name: &str) -> Option<Assignment> {
        self.assignments.get(subject_id, experiment_name).cloned()
    }

    pub fn assignments(&mut self) -> &[Assignment] {
        self.assignments.all()
    }

    pub fn record_conversion(
        &mut self,
        subject_id: &str,
        experiment_name: &str,
        conversion_type: &str,
        value: f64,
    ) {
        self.recorder.record_conversion(
            &mut self.assignments,
            subject_id,
            experiment_name,
            conversion_type,
            value,
        );
    }

    pub fn record_event(
        &mut self,
        subject_id: &str,
        experiment_name: &str,
        event_name: &str,
        data: serde_json::Value,
    ) {
        self.recorder.record_event(
            &mut self.assignments,
            subject_id,
            experiment_name,
            event_name,
            data,
        );
    }

    pub fn events(&mut self) -> &[Event] {
        self.recorder.events()
    }

    /// Replays the event log into per-experiment results.
    pub fn results(&mut self) -> Vec<ExperimentReport> {
        build_reports(self.recorder.events())
    }

    /// Drops every assignment and the whole event log.
    pub fn clear(&mut self) {
        self.assignments.clear();
        self.recorder.clear();
    }
}
