//! Configuration validation and experiment registry loading.
//!
//! Experiments live in `[experiment.<name>]` sections:
//!
//! ```ini
//! [experiment.checkout_button]
//! variants = A,B
//! weights = 0.2,0.8
//! ```

use crate::domain::error::AbTestError;
use crate::domain::experiment::{Experiment, ExperimentRegistry};
use crate::ports::config_port::ConfigPort;

pub const EXPERIMENT_SECTION_PREFIX: &str = "experiment.";

pub fn validate_experiment_config(config: &dyn ConfigPort) -> Result<(), AbTestError> {
    build_registry(config).map(|_| ())
}

pub fn validate_storage_config(config: &dyn ConfigPort) -> Result<(), AbTestError> {
    let backend = config
        .get_string("storage", "backend")
        .unwrap_or_else(|| "sqlite".to_string());
    match backend.as_str() {
        "memory" => Ok(()),
        "sqlite" => match config.get_string("storage", "path") {
            Some(p) if !p.trim().is_empty() => Ok(()),
            _ => Err(AbTestError::ConfigMissing {
                section: "storage".to_string(),
                key: "path".to_string(),
            }),
        },
        other => Err(AbTestError::ConfigInvalid {
            section: "storage".to_string(),
            key: "backend".to_string(),
            reason: format!("unknown backend '{other}', expected sqlite or memory"),
        }),
    }
}

/// Builds the registry from every `[experiment.<name>]` section.
pub fn build_registry(config: &dyn ConfigPort) -> Result<ExperimentRegistry, AbTestError> {
    let mut registry = ExperimentRegistry::new();
    for section in config.sections() {
        let Some(name) = section.strip_prefix(EXPERIMENT_SECTION_PREFIX) else {
            continue;
        };
        registry.insert(parse_experiment(config, &section, name)?);
    }
    Ok(registry)
}

fn parse_experiment(
    config: &dyn ConfigPort,
    section: &str,
    name: &str,
) -> Result<Experiment, AbTestError> {
    let variants_str =
        config
            .get_string(section, "variants")
            .ok_or_else(|| AbTestError::ConfigMissing {
                section: section.to_string(),
                key: "variants".to_string(),
            })?;
    let variants: Vec<String> = variants_str
        .split(',')
        .map(|v| v.trim().to_string())
        .collect();

    let weights = match config
        .get_string(section, "weights")
        .filter(|s| !s.trim().is_empty())
    {
        Some(s) => Some(parse_weights(section, &s)?),
        None => None,
    };

    Experiment::new(name, variants, weights)
}

fn parse_weights(section: &str, input: &str) -> Result<Vec<f64>, AbTestError> {
    input
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<f64>()
                .map_err(|_| AbTestError::ConfigInvalid {
                    section: section.to_string(),
                    key: "weights".to_string(),
                    reason: format!("invalid weight '{}'", token.trim()),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn builds_registry_from_sections() {
        let config = adapter(
            "[engine]\ndefault_variant = A\n\n\
             [experiment.checkout_button]\nvariants = A, B\nweights = 0.2, 0.8\n\n\
             [experiment.Hero_Banner]\nvariants = control,wide,tall\n",
        );
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), 2);

        let checkout = registry.get("checkout_button").unwrap();
        assert_eq!(checkout.variants, vec!["A", "B"]);
        assert_eq!(checkout.weights, vec![0.2, 0.8]);

        let hero = registry.get("Hero_Banner").unwrap();
        assert_eq!(hero.variants.len(), 3);
        assert!((hero.weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_variants_key() {
        let config = adapter("[experiment.hero]\nweights = 0.5,0.5\n");
        match build_registry(&config) {
            Err(AbTestError::ConfigMissing { section, key }) => {
                assert_eq!(section, "experiment.hero");
                assert_eq!(key, "variants");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn non_numeric_weight() {
        let config = adapter("[experiment.hero]\nvariants = A,B\nweights = 0.5,lots\n");
        let err = validate_experiment_config(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid config value [experiment.hero] weights: invalid weight 'lots'"
        );
    }

    #[test]
    fn single_variant_rejected() {
        let config = adapter("[experiment.hero]\nvariants = A\n");
        assert!(validate_experiment_config(&config).is_err());
    }

    #[test]
    fn no_experiments_is_valid() {
        let config = adapter("[engine]\ndefault_variant = A\n");
        assert!(build_registry(&config).unwrap().is_empty());
    }

    #[test]
    fn storage_defaults_to_sqlite_and_needs_path() {
        let config = adapter("[engine]\n");
        assert!(matches!(
            validate_storage_config(&config),
            Err(AbTestError::ConfigMissing { .. })
        ));
        let config = adapter("[storage]\npath = /tmp/abtest.db\n");
        assert!(validate_storage_config(&config).is_ok());
    }

    #[test]
    fn storage_memory_backend() {
        let config = adapter("[storage]\nbackend = memory\n");
        assert!(validate_storage_config(&config).is_ok());
    }

    #[test]
    fn storage_unknown_backend() {
        let config = adapter("[storage]\nbackend = redis\n");
        assert!(matches!(
            validate_storage_config(&config),
            Err(AbTestError::ConfigInvalid { .. })
        ));
    }
}
