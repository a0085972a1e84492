//! Experiment definitions, the registry, and weighted variant selection.

use crate::domain::error::AbTestError;
use std::collections::HashMap;

/// Tolerance used when deciding whether a weight vector already sums to 1.
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub name: String,
    pub variants: Vec<String>,
    /// Selection probabilities, one per variant, summing to 1.
    pub weights: Vec<f64>,
}

impl Experiment {
    /// Builds an experiment with uniform weights.
    pub fn uniform(name: &str, variants: &[&str]) -> Result<Self, AbTestError> {
        Self::new(name, variants.iter().map(|v| v.to_string()).collect(), None)
    }

    /// Builds an experiment, validating and normalising `weights`.
    ///
    /// Weights that do not sum to 1 are scaled so they do.
    pub fn new(
        name: &str,
        variants: Vec<String>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, AbTestError> {
        let section = format!("experiment.{name}");
        let invalid = |key: &str, reason: &str| AbTestError::ConfigInvalid {
            section: section.clone(),
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("name", "experiment name must not be empty"));
        }
        if variants.len() < 2 {
            return Err(invalid("variants", "at least two variants are required"));
        }
        if variants.iter().any(|v| v.trim().is_empty()) {
            return Err(invalid("variants", "variant labels must not be empty"));
        }
        for (i, v) in variants.iter().enumerate() {
            if variants[..i].contains(v) {
                return Err(invalid("variants", &format!("duplicate variant: {v}")));
            }
        }

        let weights = match weights {
            None => vec![1.0 / variants.len() as f64; variants.len()],
            Some(w) => {
                if w.len() != variants.len() {
                    return Err(invalid(
                        "weights",
                        "weights must have one entry per variant",
                    ));
                }
                if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
                    return Err(invalid("weights", "weights must be non-negative"));
                }
                if !w.iter().sum::<f64>().is_finite() {
                    return Err(invalid("weights", "weights overflow when summed"));
                }
                normalize_weights(&w)
                    .ok_or_else(|| invalid("weights", "weights must not all be zero"))?
            }
        };

        Ok(Self {
            name: name.to_string(),
            variants,
            weights,
        })
    }

    /// Picks a variant for the uniform draw `r` in `[0, 1)`.
    pub fn select(&self, r: f64) -> &str {
        select_variant(&self.variants, &self.weights, r)
    }
}

/// Scales `weights` to sum to 1. Returns `None` when they sum to zero or
/// the sum is not finite.
pub fn normalize_weights(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    if (total - 1.0).abs() <= WEIGHT_SUM_EPSILON {
        return Some(weights.to_vec());
    }
    Some(weights.iter().map(|w| w / total).collect())
}

/// Walks `variants` in order, accumulating `weights`, and returns the first
/// variant whose cumulative weight reaches `r`. Falls back to the last
/// variant when rounding leaves the walk without a match.
pub fn select_variant<'a>(variants: &'a [String], weights: &[f64], r: f64) -> &'a str {
    let mut cumulative = 0.0;
    for (variant, weight) in variants.iter().zip(weights) {
        cumulative += weight;
        if r <= cumulative {
            return variant;
        }
    }
    variants.last().map(String::as_str).unwrap_or_default()
}

/// Read-only mapping from experiment name to its definition.
#[derive(Debug, Clone, Default)]
pub struct ExperimentRegistry {
    experiments: HashMap<String, Experiment>,
    order: Vec<String>,
}

impl ExperimentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_experiment(mut self, experiment: Experiment) -> Self {
        self.insert(experiment);
        self
    }

    /// Adds or replaces an experiment definition.
    pub fn insert(&mut self, experiment: Experiment) {
        if !self.experiments.contains_key(&experiment.name) {
            self.order.push(experiment.name.clone());
        }
        self.experiments.insert(experiment.name.clone(), experiment);
    }

    pub fn get(&self, name: &str) -> Option<&Experiment> {
        self.experiments.get(name)
    }

    /// Experiments in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.order.iter().filter_map(|name| self.experiments.get(name))
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}
