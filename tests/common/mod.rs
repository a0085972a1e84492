#![allow(dead_code)]

use abtest::adapters::memory_adapter::{MemoryCollector, MemoryDiagnostics, MemoryStore};
use abtest::domain::context::ExperimentContext;
use abtest::domain::experiment::{Experiment, ExperimentRegistry};
use abtest::ports::storage_port::StoragePort;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Write;
use std::sync::Arc;

pub struct Harness {
    pub storage: Arc<MemoryStore>,
    pub collector: Arc<MemoryCollector>,
    pub diagnostics: Arc<MemoryDiagnostics>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStore::new()),
            collector: Arc::new(MemoryCollector::new()),
            diagnostics: Arc::new(MemoryDiagnostics::new()),
        }
    }

    /// A seeded context over this harness's storage.
    pub fn context(&self, registry: ExperimentRegistry, seed: u64) -> ExperimentContext {
        self.context_on(self.storage.clone(), registry, seed)
    }

    pub fn context_on(
        &self,
        storage: Arc<dyn StoragePort>,
        registry: ExperimentRegistry,
        seed: u64,
    ) -> ExperimentContext {
        ExperimentContext::new(
            registry,
            storage,
            self.collector.clone(),
            self.diagnostics.clone(),
        )
        .with_rng(StdRng::seed_from_u64(seed))
    }
}

pub fn checkout_registry() -> ExperimentRegistry {
    ExperimentRegistry::new()
        .with_experiment(Experiment::uniform("checkout_button", &["A", "B"]).unwrap())
}

pub fn weighted_registry() -> ExperimentRegistry {
    ExperimentRegistry::new().with_experiment(
        Experiment::new(
            "pricing",
            vec!["A".into(), "B".into(), "C".into()],
            Some(vec![0.5, 0.3, 0.2]),
        )
        .unwrap(),
    )
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
