//! Supervised provider processes
//!
//! Some providers are local programs the router launches itself and reaches
//! over loopback. This module owns their lifecycle: start at boot, restart on
//! transport failure, stop at shutdown.
//!
//! Restarts are gated per provider. Each gate carries a generation counter
//! that is bumped on every restart attempt, so a caller that failed against an older
//! generation can tell that someone else already restarted the process and
//! skip its own restart.

mod process;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::routes::metrics::record_process_restart;
use crate::routing::provider::Endpoint;
use crate::routing::{Provider, RouterSettings};

pub use process::LocalProcess;

/// Supervisor errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("{provider} has no binary path configured")]
    NotConfigured { provider: Provider },

    #[error("failed to spawn {provider}: {source}")]
    Spawn {
        provider: Provider,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stop {provider}: {source}")]
    Stop {
        provider: Provider,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a supervised provider")]
    NotSupervised(Provider),
}

/// How to launch one supervised provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub provider: Provider,
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub port: u16,
}

impl LaunchSpec {
    /// Build the launch spec from current settings
    ///
    /// Returns `None` for remote providers and for supervised providers
    /// without a binary path.
    pub fn from_settings(provider: Provider, settings: &RouterSettings) -> Option<Self> {
        let Endpoint::Supervised { default_port } = provider.endpoint() else {
            return None;
        };
        let slot = provider.settings(&settings.providers);
        let binary = slot.binary_path.clone()?;
        let port = slot.port.unwrap_or(default_port);

        let args = match provider {
            Provider::CliProxyApi => match &slot.config_path {
                Some(path) => vec!["--config".to_string(), path.display().to_string()],
                None => Vec::new(),
            },
            Provider::Copilot => vec!["start".to_string(), "--port".to_string(), port.to_string()],
            _ => Vec::new(),
        };

        Some(Self {
            provider,
            binary,
            args,
            port,
        })
    }
}

/// Lifecycle operations the router needs from a subordinate process
#[async_trait]
pub trait SupervisedProcess: Send + Sync {
    async fn is_running(&self) -> bool;

    async fn start(&self, launch: &LaunchSpec) -> Result<(), SupervisorError>;

    async fn stop(&self) -> Result<(), SupervisorError>;

    async fn restart(&self, launch: &LaunchSpec) -> Result<(), SupervisorError> {
        self.stop().await?;
        self.start(launch).await
    }
}

/// Health view of one supervised provider
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStatus {
    pub provider: Provider,
    pub running: bool,
    pub restarts: u64,
}

struct Supervised {
    process: Arc<dyn SupervisedProcess>,
    gate: Mutex<()>,
    generation: AtomicU64,
    restarts: AtomicU64,
}

/// Handles for every supervised provider, shared across requests
pub struct ProcessRegistry {
    entries: HashMap<Provider, Supervised>,
}

impl ProcessRegistry {
    /// Registry backed by real subprocesses
    pub fn new() -> Self {
        Self::with_processes(Provider::SUPERVISED.into_iter().map(|provider| {
            let process: Arc<dyn SupervisedProcess> = Arc::new(LocalProcess::new(provider));
            (provider, process)
        }))
    }

    /// Registry with caller-provided process handles
    pub fn with_processes(
        processes: impl IntoIterator<Item = (Provider, Arc<dyn SupervisedProcess>)>,
    ) -> Self {
        let entries = processes
            .into_iter()
            .map(|(provider, process)| {
                (
                    provider,
                    Supervised {
                        process,
                        gate: Mutex::new(()),
                        generation: AtomicU64::new(0),
                        restarts: AtomicU64::new(0),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Restart generation of `provider`; read before an attempt, passed to
    /// [`ProcessRegistry::restart_if_stale`] after it fails
    pub fn generation(&self, provider: Provider) -> u64 {
        self.entries
            .get(&provider)
            .map(|entry| entry.generation.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Restart `provider` unless it was restarted since `observed` was read
    ///
    /// Returns whether this call performed the restart. Concurrent callers
    /// that observed the same generation queue on the gate; the first one
    /// restarts and the rest return `Ok(false)`.
    pub async fn restart_if_stale(
        &self,
        provider: Provider,
        observed: u64,
        launch: Option<&LaunchSpec>,
    ) -> Result<bool, SupervisorError> {
        let entry = self
            .entries
            .get(&provider)
            .ok_or(SupervisorError::NotSupervised(provider))?;

        let _gate = entry.gate.lock().await;
        if entry.generation.load(Ordering::Acquire) != observed {
            return Ok(false);
        }
        // Bumped even when the restart fails, so queued callers do not retry it
        entry.generation.fetch_add(1, Ordering::AcqRel);

        let launch = launch.ok_or(SupervisorError::NotConfigured { provider })?;
        warn!(provider = %provider, binary = %launch.binary.display(), "Restarting supervised provider");
        entry.process.restart(launch).await?;

        entry.restarts.fetch_add(1, Ordering::AcqRel);
        record_process_restart(provider.name());
        Ok(true)
    }

    /// Start every enabled supervised provider that has a binary configured
    pub async fn start_enabled(&self, settings: &RouterSettings) {
        for (provider, entry) in &self.entries {
            if !provider.settings(&settings.providers).enabled {
                continue;
            }
            let Some(launch) = LaunchSpec::from_settings(*provider, settings) else {
                info!(provider = %provider, "No binary configured, expecting an externally managed process");
                continue;
            };
            match entry.process.start(&launch).await {
                Ok(()) => info!(provider = %provider, port = launch.port, "Supervised provider started"),
                Err(e) => warn!(provider = %provider, error = %e, "Failed to start supervised provider"),
            }
        }
    }

    /// Stop every supervised process
    pub async fn stop_all(&self) {
        for (provider, entry) in &self.entries {
            if let Err(e) = entry.process.stop().await {
                warn!(provider = %provider, error = %e, "Failed to stop supervised provider");
            }
        }
    }

    /// Running state of every supervised provider, in registry order
    pub async fn status(&self) -> Vec<ProcessStatus> {
        let mut statuses = Vec::with_capacity(self.entries.len());
        for provider in Provider::SUPERVISED {
            if let Some(entry) = self.entries.get(&provider) {
                statuses.push(ProcessStatus {
                    provider,
                    running: entry.process.is_running().await,
                    restarts: entry.restarts.load(Ordering::Acquire),
                });
            }
        }
        statuses
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}
