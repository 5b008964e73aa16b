//! Server configuration for the router
//!
//! Configuration is loaded from environment variables. Routing decisions
//! (mappings, provider credentials, audit toggle) live in a separate settings
//! file, see [`crate::routing::settings`].

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 4001;

/// Default upstream used for pass-through requests
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.anthropic.com";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Upstream that receives pass-through traffic
    pub upstream_url: String,

    /// Routing settings file, re-read whenever it changes on disk
    pub settings_path: PathBuf,

    /// Directory that receives one JSON audit record per request
    pub audit_dir: PathBuf,

    /// How long to wait after restarting a supervised provider before retrying
    pub restart_settle: Duration,
    /// TCP connect timeout for outbound calls (no whole-request deadline is applied)
    pub connect_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("ROUTER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("ROUTER_PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .context("Invalid ROUTER_PORT")?,

            upstream_url: env::var("ROUTER_UPSTREAM_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string()),

            settings_path: env::var("ROUTER_SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("model-router.json")),

            audit_dir: env::var("ROUTER_AUDIT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs/audit")),

            restart_settle: Duration::from_millis(
                env::var("ROUTER_RESTART_SETTLE_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()
                    .context("Invalid ROUTER_RESTART_SETTLE_MS")?,
            ),
            connect_timeout: Duration::from_secs(
                env::var("ROUTER_CONNECT_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("Invalid ROUTER_CONNECT_TIMEOUT_SECS")?,
            ),
        })
    }
}
