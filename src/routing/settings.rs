//! Routing settings
//!
//! Typed view over the routing settings file. The file is owned by an external
//! tool (the editor integration writes it); the router only reads it. JSON on
//! disk uses camelCase keys and every field has a default, so a partial file is
//! valid.
//!
//! ```json
//! {
//!   "mappings": { "haiku": "pass", "main": "glm:glm-4-plus" },
//!   "auditLogging": true,
//!   "providers": {
//!     "glm": { "enabled": true, "apiKey": "..." },
//!     "cliproxyapi": { "enabled": true, "binaryPath": "/usr/local/bin/cli-proxy-api", "port": 8317 }
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::ModelClass;

/// Mapping string meaning "forward to the default upstream untouched"
pub const PASS: &str = "pass";

/// Root of the routing settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterSettings {
    pub mappings: MappingSettings,
    pub providers: ProvidersSettings,
    /// Write one audit record per proxied request
    pub audit_logging: bool,
}

/// One mapping string per model class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingSettings {
    pub haiku: String,
    pub main: String,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            haiku: PASS.to_string(),
            main: PASS.to_string(),
        }
    }
}

impl MappingSettings {
    pub fn for_class(&self, class: ModelClass) -> &str {
        match class {
            ModelClass::Haiku => &self.haiku,
            ModelClass::Main => &self.main,
        }
    }
}

/// Per-provider settings, one field per known provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersSettings {
    pub glm: ProviderSettings,
    pub kimi: ProviderSettings,
    pub minimax: ProviderSettings,
    pub deepseek: ProviderSettings,
    pub cliproxyapi: ProviderSettings,
    pub copilot: ProviderSettings,
}

/// Settings for a single provider
///
/// `binary_path`, `port` and `config_path` only apply to locally supervised
/// providers; `endpoint` only applies to remote ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub endpoint: Option<String>,
    pub binary_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug)]
struct Cached {
    settings: Arc<RouterSettings>,
    modified: Option<SystemTime>,
}

/// Source of per-request settings snapshots
///
/// File-backed stores stat the file on every snapshot and reload it when its
/// modification time changes, so edits apply to the next request. A file that
/// fails to parse leaves the previous snapshot in place.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    cached: RwLock<Cached>,
}

impl SettingsStore {
    /// Store backed by a settings file
    pub async fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = Self {
            path: Some(path.clone()),
            cached: RwLock::new(Cached {
                settings: Arc::new(RouterSettings::default()),
                modified: None,
            }),
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                let mut cached = store.cached.write().await;
                reload(&path, meta.modified().ok(), &mut cached).await;
            }
            Err(_) => {
                info!(path = %path.display(), "No routing settings file found, using defaults");
            }
        }

        store
    }

    /// Store holding fixed settings, updated only through [`SettingsStore::replace`]
    pub fn fixed(settings: RouterSettings) -> Self {
        Self {
            path: None,
            cached: RwLock::new(Cached {
                settings: Arc::new(settings),
                modified: None,
            }),
        }
    }

    /// Current settings, reloaded from disk if the file changed
    pub async fn snapshot(&self) -> Arc<RouterSettings> {
        let Some(path) = &self.path else {
            return self.cached.read().await.settings.clone();
        };

        let modified = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok());

        {
            let cached = self.cached.read().await;
            if cached.modified == modified {
                return cached.settings.clone();
            }
        }

        let mut cached = self.cached.write().await;
        if cached.modified != modified {
            match modified {
                Some(_) => reload(path, modified, &mut cached).await,
                None => {
                    warn!(path = %path.display(), "Routing settings file disappeared, using defaults");
                    cached.settings = Arc::new(RouterSettings::default());
                    cached.modified = None;
                }
            }
        }
        cached.settings.clone()
    }

    /// Swap in new settings (change notification from the settings owner)
    pub async fn replace(&self, settings: RouterSettings) {
        let mut cached = self.cached.write().await;
        cached.settings = Arc::new(settings);
    }
}

async fn reload(path: &Path, modified: Option<SystemTime>, cached: &mut Cached) {
    // Record the stamp even on failure so a broken file is reported once, not per request
    cached.modified = modified;

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read routing settings");
            return;
        }
    };

    match serde_json::from_str::<RouterSettings>(&content) {
        Ok(settings) => {
            debug!(
                path = %path.display(),
                haiku = %settings.mappings.haiku,
                main = %settings.mappings.main,
                audit_logging = settings.audit_logging,
                "Routing settings loaded"
            );
            cached.settings = Arc::new(settings);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid routing settings, keeping previous");
        }
    }
}
