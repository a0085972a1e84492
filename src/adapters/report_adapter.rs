//! Text and JSON renderings of experiment results.

use crate::domain::error::AbTestError;
use crate::domain::report::ExperimentReport;
use crate::domain::significance::SignificanceResult;
use crate::ports::report_port::ReportPort;
use std::fmt::Write;

/// Plain-text table per experiment, followed by the significance summary.
#[derive(Default)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for TextReportAdapter {
    fn render(&self, reports: &[ExperimentReport]) -> Result<String, AbTestError> {
        let mut out = String::new();
        if reports.is_empty() {
            out.push_str("No experiment data recorded.\n");
            return Ok(out);
        }

        for (i, report) in reports.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            format_experiment(&mut out, report);
        }
        Ok(out)
    }
}

fn format_experiment(out: &mut String, report: &ExperimentReport) {
    let _ = writeln!(out, "Experiment: {}", report.name);
    let _ = writeln!(
        out,
        "  {:<12} {:>11} {:>11} {:>10}",
        "Variant", "Impressions", "Conversions", "Rate"
    );
    for v in &report.variants {
        let _ = writeln!(
            out,
            "  {:<12} {:>11} {:>11} {:>10}",
            v.variant,
            v.impressions,
            v.conversions,
            v.formatted_rate
        );
        for (kind, count) in &v.conversions_by_type {
            let _ = writeln!(out, "    conversion {kind}: {count}");
        }
        for (name, count) in &v.events_by_name {
            let _ = writeln!(out, "    event {name}: {count}");
        }
    }

    match &report.significance {
        Some(sig) => format_significance(out, sig),
        None => {
            let _ = writeln!(out, "  Significance: not enough data");
        }
    }
}

fn format_significance(out: &mut String, sig: &SignificanceResult) {
    let _ = writeln!(
        out,
        "  {} vs {}: diff {:+.2}% (95% CI {:+.2}% to {:+.2}%)",
        sig.variant_a.variant,
        sig.variant_b.variant,
        sig.difference * 100.0,
        sig.confidence_interval.lower * 100.0,
        sig.confidence_interval.upper * 100.0
    );
    let _ = writeln!(
        out,
        "  z = {:.3}, p = {:.4}, confidence {:.1}% -> {}",
        sig.z_score,
        sig.p_value,
        sig.confidence,
        if sig.significant {
            "significant"
        } else {
            "not significant"
        }
    );
}

/// Pretty-printed JSON array of reports.
#[derive(Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for JsonReportAdapter {
    fn render(&self, reports: &[ExperimentReport]) -> Result<String, AbTestError> {
        let mut json = serde_json::to_string_pretty(reports)?;
        json.push('\n');
        Ok(json)
    }
}
