//! Model Router - model-aware proxy for chat-completion traffic
//!
//! Classifies each request by the model it names, maps that class to a
//! backend provider according to a settings file, rewrites the request for
//! the provider and relays the (possibly streamed) response back. Providers
//! that run as local processes are supervised and restarted on transport
//! failure.

pub mod audit;
pub mod config;
pub mod error;
pub mod proxy;
pub mod routes;
pub mod routing;
pub mod streaming;
pub mod supervisor;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::audit::AuditSink;
pub use crate::config::Config;
pub use crate::proxy::Forwarder;
pub use crate::routing::{RouterSettings, SettingsStore};
pub use crate::supervisor::{ProcessRegistry, SupervisedProcess};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Routing settings, snapshotted once per request
    pub settings: Arc<SettingsStore>,
    /// Supervised provider processes and their restart gates
    pub processes: Arc<ProcessRegistry>,
    /// Outbound sender with restart-and-retry
    pub forwarder: Forwarder,
    pub audit: AuditSink,
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state from server configuration
    pub async fn new(config: Config) -> Result<Self> {
        let settings = SettingsStore::from_file(config.settings_path.clone()).await;
        Self::with_parts(config, settings, ProcessRegistry::new())
    }

    /// Create an application state from prepared parts
    ///
    /// Used by tests to inject fixed settings and fake supervised processes.
    pub fn with_parts(
        config: Config,
        settings: SettingsStore,
        processes: ProcessRegistry,
    ) -> Result<Self> {
        let http_client = proxy::build_client(config.connect_timeout)?;
        let processes = Arc::new(processes);
        let forwarder = Forwarder::new(http_client, processes.clone(), config.restart_settle);
        let audit = AuditSink::new(config.audit_dir.clone());

        Ok(Self {
            config,
            settings: Arc::new(settings),
            processes,
            forwarder,
            audit,
            start_time: Instant::now(),
        })
    }
}
