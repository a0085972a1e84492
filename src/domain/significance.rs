//! Two-proportion z-test between two variants.

use crate::domain::aggregate::VariantStats;
use serde::Serialize;

/// Two-tailed threshold below which a difference counts as significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// z critical value for a 95% confidence interval.
const Z_95: f64 = 1.96;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSummary {
    pub variant: String,
    pub rate: f64,
    pub conversions: u64,
    pub impressions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificanceResult {
    pub variant_a: SideSummary,
    pub variant_b: SideSummary,
    /// `rate_a - rate_b`.
    pub difference: f64,
    pub confidence_interval: ConfidenceInterval,
    pub z_score: f64,
    pub p_value: f64,
    pub significant: bool,
    /// `(1 - p_value) * 100`.
    pub confidence: f64,
}

/// Standard normal CDF, Zelen & Severo (1964) polynomial approximation.
/// Absolute error is below 7.5e-8.
pub fn normal_cdf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989423 * (-x * x / 2.0).exp();
    let p = d
        * t
        * (0.3193815 + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));
    if x > 0.0 { 1.0 - p } else { p }
}

/// Compares two variants with a pooled two-proportion z-test.
///
/// Both sides must have at least one impression. When the pooled standard
/// error is zero (no conversions anywhere, or every impression converted)
/// the test reports z = 0 and p = 1.
pub fn significance(a: &VariantStats, b: &VariantStats) -> SignificanceResult {
    let imp_a = a.impressions as f64;
    let imp_b = b.impressions as f64;
    let conv_a = a.conversions as f64;
    let conv_b = b.conversions as f64;

    let rate_a = conv_a / imp_a;
    let rate_b = conv_b / imp_b;
    let pooled = (conv_a + conv_b) / (imp_a + imp_b);
    let se = (pooled * (1.0 - pooled) * (1.0 / imp_a + 1.0 / imp_b)).sqrt();

    let difference = rate_a - rate_b;
    let (z_score, p_value) = if se > 0.0 {
        let z = difference / se;
        (z, 2.0 * (1.0 - normal_cdf(z.abs())))
    } else {
        (0.0, 1.0)
    };
    let margin = Z_95 * se;

    SignificanceResult {
        variant_a: SideSummary {
            variant: a.variant.clone(),
            rate: rate_a,
            conversions: a.conversions,
            impressions: a.impressions,
        },
        variant_b: SideSummary {
            variant: b.variant.clone(),
            rate: rate_b,
            conversions: b.conversions,
            impressions: b.impressions,
        },
        difference,
        confidence_interval: ConfidenceInterval {
            lower: difference - margin,
            upper: difference + margin,
        },
        z_score,
        p_value,
        significant: p_value < SIGNIFICANCE_LEVEL,
        confidence: (1.0 - p_value) * 100.0,
    }
}
