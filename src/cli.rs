//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::csv_adapter::export_events;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_adapter::{MemoryStore, NoopCollector};
use crate::adapters::report_adapter::{JsonReportAdapter, TextReportAdapter};
use crate::adapters::stored_identity::StoredIdentity;
use crate::adapters::tracing_diagnostics::TracingDiagnostics;
use crate::domain::config_validation::{
    build_registry, validate_experiment_config, validate_storage_config,
};
use crate::domain::context::{DEFAULT_VARIANT, ExperimentContext};
use crate::domain::error::AbTestError;
use crate::ports::collector_port::CollectorPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::diagnostics_port::DiagnosticsPort;
use crate::ports::identity_port::IdentityPort;
use crate::ports::report_port::ReportPort;
use crate::ports::storage_port::StoragePort;

#[derive(Parser, Debug)]
#[command(name = "abtest", about = "A/B experiment assignment and analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get (or create) the variant for a subject
    Assign {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        experiment: String,
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Record a conversion for an assigned subject
    Convert {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        experiment: String,
        #[arg(long = "type", default_value = "conversion")]
        conversion_type: String,
        #[arg(long, default_value_t = 0.0)]
        value: f64,
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Record a custom event for an assigned subject
    Track {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        experiment: String,
        #[arg(short, long)]
        name: String,
        /// Event data as JSON
        #[arg(long)]
        data: Option<String>,
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Show aggregated results and significance
    Report {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored assignments
    Assignments {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Export the event log as CSV
    Export {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Delete all assignments and events
    Clear {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Assign {
            config,
            experiment,
            subject,
        } => with_session(&config, |session| {
            let subject = session.resolve_subject(subject)?;
            let variant = session.context.get_variant(&subject, &experiment);
            println!("{variant}");
            Ok(())
        }),
        Command::Convert {
            config,
            experiment,
            conversion_type,
            value,
            subject,
        } => with_session(&config, |session| {
            let subject = session.resolve_subject(subject)?;
            session
                .context
                .record_conversion(&subject, &experiment, &conversion_type, value);
            Ok(())
        }),
        Command::Track {
            config,
            experiment,
            name,
            data,
            subject,
        } => with_session(&config, |session| {
            let data = parse_event_data(data.as_deref())?;
            let subject = session.resolve_subject(subject)?;
            session
                .context
                .record_event(&subject, &experiment, &name, data);
            Ok(())
        }),
        Command::Report {
            config,
            format,
            output,
        } => with_session(&config, |session| {
            let reports = session.context.results();
            let adapter: Box<dyn ReportPort> = match format {
                ReportFormat::Text => Box::new(TextReportAdapter::new()),
                ReportFormat::Json => Box::new(JsonReportAdapter::new()),
            };
            match output {
                Some(path) => {
                    adapter.write(&reports, &path.to_string_lossy())?;
                    info!("Report written to {}", path.display());
                }
                None => print!("{}", adapter.render(&reports)?),
            }
            Ok(())
        }),
        Command::Assignments { config, subject } => with_session(&config, |session| {
            for a in session
                .context
                .assignments()
                .iter()
                .filter(|a| subject.as_ref().is_none_or(|s| &a.subject_id == s))
            {
                println!(
                    "{}\t{}\t{}\t{}",
                    a.subject_id,
                    a.experiment_name,
                    a.variant,
                    a.assigned_at.to_rfc3339()
                );
            }
            Ok(())
        }),
        Command::Export { config, output } => with_session(&config, |session| {
            let events = session.context.events();
            export_events(&output, events)?;
            info!("Exported {} events to {}", events.len(), output.display());
            Ok(())
        }),
        Command::Clear { config } => with_session(&config, |session| {
            session.context.clear();
            info!("Cleared all assignments and events");
            Ok(())
        }),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, AbTestError> {
    FileConfigAdapter::from_file(path).map_err(|e| AbTestError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let result = load_config(config_path).and_then(|adapter| {
        validate_storage_config(&adapter)?;
        validate_experiment_config(&adapter)?;
        build_registry(&adapter)
    });
    match result {
        Ok(registry) => {
            println!("Configuration valid: {} experiment(s)", registry.len());
            for exp in registry.iter() {
                let weights: Vec<String> = exp.weights.iter().map(|w| format!("{w:.3}")).collect();
                println!(
                    "  {}: {} [{}]",
                    exp.name,
                    exp.variants.join(","),
                    weights.join(",")
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn parse_event_data(data: Option<&str>) -> Result<serde_json::Value, AbTestError> {
    match data {
        None => Ok(serde_json::Value::Null),
        Some(s) => Ok(serde_json::from_str(s)?),
    }
}

/// Everything one CLI invocation needs: the context plus the handles that
/// must outlive it.
pub struct Session {
    pub context: ExperimentContext,
    storage: Arc<dyn StoragePort>,
    #[cfg(feature = "http")]
    delivery: Option<Delivery>,
}

/// Runtime driving HTTP deliveries, and the collector whose tasks it runs.
#[cfg(feature = "http")]
type Delivery = (
    tokio::runtime::Runtime,
    Arc<crate::adapters::http_collector::HttpCollector>,
);

impl Session {
    pub fn open(config: &dyn ConfigPort) -> Result<Self, AbTestError> {
        validate_storage_config(config)?;
        let registry = build_registry(config)?;
        let storage = open_storage(config)?;
        let diagnostics: Arc<dyn DiagnosticsPort> = Arc::new(TracingDiagnostics);

        #[cfg(feature = "http")]
        let (collector, delivery) = open_http_collector(config, diagnostics.clone())?;
        #[cfg(not(feature = "http"))]
        let collector = open_offline_collector(config);

        let default_variant = config
            .get_string("engine", "default_variant")
            .unwrap_or_else(|| DEFAULT_VARIANT.to_string());
        let context = ExperimentContext::new(registry, storage.clone(), collector, diagnostics)
            .with_default_variant(&default_variant);

        Ok(Self {
            context,
            storage,
            #[cfg(feature = "http")]
            delivery,
        })
    }

    /// Uses `explicit` when given, otherwise the persisted subject id.
    pub fn resolve_subject(&self, explicit: Option<String>) -> Result<String, AbTestError> {
        match explicit {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => StoredIdentity::new(self.storage.clone()).subject_id(),
        }
    }

    /// Waits for in-flight collector deliveries.
    pub fn finish(self) {
        #[cfg(feature = "http")]
        {
            if let Some((runtime, collector)) = self.delivery {
                runtime.block_on(collector.drain());
            }
        }
        #[cfg(not(feature = "http"))]
        let _ = self;
    }
}

fn with_session<F>(config_path: &PathBuf, f: F) -> ExitCode
where
    F: FnOnce(&mut Session) -> Result<(), AbTestError>,
{
    let result = load_config(config_path).and_then(|adapter| {
        let mut session = Session::open(&adapter)?;
        let outcome = f(&mut session);
        session.finish();
        outcome
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn open_storage(config: &dyn ConfigPort) -> Result<Arc<dyn StoragePort>, AbTestError> {
    let backend = config
        .get_string("storage", "backend")
        .unwrap_or_else(|| "sqlite".to_string());
    match backend.as_str() {
        "memory" => {
            warn!("memory storage selected; state is discarded on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_store::SqliteStore;
            Ok(Arc::new(SqliteStore::from_config(config)?))
        }
        other => Err(AbTestError::ConfigInvalid {
            section: "storage".into(),
            key: "backend".into(),
            reason: format!("backend '{other}' is not available in this build"),
        }),
    }
}

#[cfg(not(feature = "http"))]
fn open_offline_collector(config: &dyn ConfigPort) -> Arc<dyn CollectorPort> {
    if config.get_string("collector", "url").is_some() {
        warn!("collector url configured but the http feature is disabled; events stay local");
    }
    Arc::new(NoopCollector)
}

#[cfg(feature = "http")]
fn open_http_collector(
    config: &dyn ConfigPort,
    diagnostics: Arc<dyn DiagnosticsPort>,
) -> Result<(Arc<dyn CollectorPort>, Option<Delivery>), AbTestError> {
    use crate::adapters::http_collector::HttpCollector;

    let Some(collector) = HttpCollector::from_config(config, diagnostics)? else {
        return Ok((Arc::new(NoopCollector), None));
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let collector = Arc::new(collector.with_runtime(runtime.handle().clone()));
    info!("Forwarding events to {}", collector.endpoint(""));
    Ok((collector.clone(), Some((runtime, collector))))
}
