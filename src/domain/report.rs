//! Per-experiment results: aggregated counters plus the pairwise z-test.

use crate::domain::aggregate::{ExperimentStats, VariantStats, aggregate};
use crate::domain::event::Event;
use crate::domain::significance::{SignificanceResult, significance};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub name: String,
    pub variants: Vec<VariantStats>,
    pub significance: Option<SignificanceResult>,
}

impl ExperimentReport {
    pub fn from_stats(stats: ExperimentStats) -> Self {
        let significance = comparison_pair(&stats.variants).map(|(a, b)| significance(a, b));
        Self {
            name: stats.name,
            variants: stats.variants,
            significance,
        }
    }
}

/// The first two variants, in first-seen order, that both have impressions.
///
/// With more than two variants this is not necessarily the two most-assigned
/// arms.
pub fn comparison_pair(variants: &[VariantStats]) -> Option<(&VariantStats, &VariantStats)> {
    let mut eligible = variants.iter().filter(|v| v.impressions > 0);
    let a = eligible.next()?;
    let b = eligible.next()?;
    Some((a, b))
}

pub fn build_reports(events: &[Event]) -> Vec<ExperimentReport> {
    aggregate(events)
        .into_iter()
        .map(ExperimentReport::from_stats)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn impressions(events: &mut Vec<Event>, variant: &str, n: usize, conversions: usize) {
        for i in 0..n {
            events.push(Event::assignment(&format!("{variant}{i}"), "hero", variant));
        }
        for i in 0..conversions {
            events.push(Event::conversion(&format!("{variant}{i}"), "hero", variant, "buy", 1.0));
        }
    }

    #[test]
    fn reports_significance_for_two_variants() {
        let mut events = Vec::new();
        impressions(&mut events, "A", 100, 12);
        impressions(&mut events, "B", 100, 18);

        let reports = build_reports(&events);
        assert_eq!(reports.len(), 1);
        let sig = reports[0].significance.as_ref().unwrap();
        assert_eq!(sig.variant_a.variant, "A");
        assert_eq!(sig.variant_b.variant, "B");
        assert_abs_diff_eq!(sig.p_value, 0.2348, epsilon = 1e-3);
        assert!(!sig.significant);
    }

    #[test]
    fn no_significance_with_single_variant() {
        let mut events = Vec::new();
        impressions(&mut events, "A", 10, 2);
        let reports = build_reports(&events);
        assert!(reports[0].significance.is_none());
    }

    #[test]
    fn variant_without_impressions_is_skipped_for_pairing() {
        let mut events = vec![Event::custom("x", "hero", "A", "hover", json!(null))];
        impressions(&mut events, "B", 10, 1);
        let reports = build_reports(&events);
        assert_eq!(reports[0].variants.len(), 2);
        assert!(reports[0].significance.is_none());

        impressions(&mut events, "C", 10, 5);
        let reports = build_reports(&events);
        let sig = reports[0].significance.as_ref().unwrap();
        assert_eq!(sig.variant_a.variant, "B");
        assert_eq!(sig.variant_b.variant, "C");
    }

    #[test]
    fn pairing_uses_first_seen_not_largest() {
        let mut events = Vec::new();
        impressions(&mut events, "A", 5, 1);
        impressions(&mut events, "B", 6, 1);
        impressions(&mut events, "C", 500, 50);
        let pair = comparison_pair(&aggregate(&events)[0].variants)
            .map(|(a, b)| (a.variant.clone(), b.variant.clone()));
        assert_eq!(pair, Some(("A".to_string(), "B".to_string())));
    }

    #[test]
    fn empty_log_has_no_reports() {
        assert!(build_reports(&[]).is_empty());
    }
}
