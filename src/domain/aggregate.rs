//! Replays the event log into per-experiment, per-variant counters.

use crate::domain::event::{Event, EventKind};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStats {
    pub variant: String,
    pub impressions: u64,
    pub conversions: u64,
    pub conversions_by_type: BTreeMap<String, u64>,
    pub events_by_name: BTreeMap<String, u64>,
    /// `conversions / impressions`, or 0 with no impressions.
    pub conversion_rate: f64,
    /// Conversion rate as a percentage with two decimals, `"0%"` when the
    /// variant has no impressions.
    pub formatted_rate: String,
}

impl VariantStats {
    pub fn new(variant: &str) -> Self {
        Self {
            variant: variant.to_string(),
            impressions: 0,
            conversions: 0,
            conversions_by_type: BTreeMap::new(),
            events_by_name: BTreeMap::new(),
            conversion_rate: 0.0,
            formatted_rate: format_rate(0, 0.0),
        }
    }
}

pub fn format_rate(impressions: u64, rate: f64) -> String {
    if impressions == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", rate * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentStats {
    pub name: String,
    /// Variants in the order they first appear in the log.
    pub variants: Vec<VariantStats>,
}

impl ExperimentStats {
    pub fn variant(&self, label: &str) -> Option<&VariantStats> {
        self.variants.iter().find(|v| v.variant == label)
    }

    fn variant_mut(&mut self, label: &str) -> &mut VariantStats {
        let pos = match self.variants.iter().position(|v| v.variant == label) {
            Some(pos) => pos,
            None => {
                self.variants.push(VariantStats::new(label));
                self.variants.len() - 1
            }
        };
        &mut self.variants[pos]
    }
}

/// Aggregates `events` into statistics, experiments in first-seen order.
///
/// Pure: the same log always produces the same result.
pub fn aggregate(events: &[Event]) -> Vec<ExperimentStats> {
    let mut experiments: Vec<ExperimentStats> = Vec::new();

    for event in events {
        let pos = match experiments
            .iter()
            .position(|e| e.name == event.experiment_name)
        {
            Some(pos) => pos,
            None => {
                experiments.push(ExperimentStats {
                    name: event.experiment_name.clone(),
                    variants: Vec::new(),
                });
                experiments.len() - 1
            }
        };
        let stats = experiments[pos].variant_mut(&event.variant);

        match &event.kind {
            EventKind::Assignment => stats.impressions += 1,
            EventKind::Conversion {
                conversion_type, ..
            } => {
                stats.conversions += 1;
                *stats
                    .conversions_by_type
                    .entry(conversion_type.clone())
                    .or_insert(0) += 1;
            }
            EventKind::Custom { event_name, .. } => {
                *stats.events_by_name.entry(event_name.clone()).or_insert(0) += 1;
            }
        }
    }

    for experiment in &mut experiments {
        for stats in &mut experiment.variants {
            stats.conversion_rate = if stats.impressions > 0 {
                stats.conversions as f64 / stats.impressions as f64
            } else {
                0.0
            };
            stats.formatted_rate = format_rate(stats.impressions, stats.conversion_rate);
        }
    }

    experiments
}
