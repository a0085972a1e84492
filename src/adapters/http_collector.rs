//! HTTP collector adapter: posts event payloads to `base_url + path`.
//!
//! `send` never waits on the network. Each delivery is spawned on the
//! attached runtime, or the ambient one when none is attached. Failures inside
//! the task are reported to the diagnostics hook. Callers that exit soon after
//! recording should [`drain`] first.
//!
//! [`drain`]: HttpCollector::drain

use crate::domain::error::AbTestError;
use crate::ports::collector_port::CollectorPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::diagnostics_port::DiagnosticsPort;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: i64 = 10;

pub struct HttpCollector {
    base_url: String,
    client: reqwest::Client,
    diagnostics: Arc<dyn DiagnosticsPort>,
    runtime: Option<Handle>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpCollector {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        diagnostics: Arc<dyn DiagnosticsPort>,
    ) -> Result<Self, AbTestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AbTestError::ConfigInvalid {
                section: "collector".into(),
                key: "url".into(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            diagnostics,
            runtime: None,
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Spawns deliveries on `handle` instead of the caller's runtime.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Builds a collector from `[collector] url`, or `None` when unset.
    pub fn from_config(
        config: &dyn ConfigPort,
        diagnostics: Arc<dyn DiagnosticsPort>,
    ) -> Result<Option<Self>, AbTestError> {
        let Some(url) = config
            .get_string("collector", "url")
            .filter(|u| !u.trim().is_empty())
        else {
            return Ok(None);
        };
        let timeout_secs = config
            .get_int("collector", "timeout_secs", DEFAULT_TIMEOUT_SECS)
            .max(1) as u64;
        Self::new(&url, Duration::from_secs(timeout_secs), diagnostics).map(Some)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Waits for every delivery spawned so far.
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl CollectorPort for HttpCollector {
    fn send(&self, path: &str, payload: &serde_json::Value) -> Result<(), AbTestError> {
        let handle = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|e| AbTestError::RemoteDelivery {
                path: path.to_string(),
                reason: e.to_string(),
            })?,
        };

        let url = self.endpoint(path);
        let request = self.client.post(&url).json(payload);
        let diagnostics = Arc::clone(&self.diagnostics);
        let path = path.to_string();

        let task = handle.spawn(async move {
            let outcome = match request.send().await {
                Ok(resp) if resp.status().is_success() => Ok(()),
                Ok(resp) => Err(format!("collector returned {}", resp.status())),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(()) => debug!(url = %url, "event delivered"),
                Err(reason) => diagnostics.warn(&AbTestError::RemoteDelivery { path, reason }),
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(task);
        }
        Ok(())
    }
}
