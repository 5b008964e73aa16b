//! Model routing
//!
//! Classifies inbound requests by model name and resolves the configured
//! mapping for that class into a concrete provider target.

pub mod provider;
pub mod resolver;
pub mod settings;

use std::fmt;

use serde::Serialize;

pub use provider::{AuthMethod, Provider, ProviderDescriptor};
pub use resolver::{resolve, Credential, ResolvedTarget};
pub use settings::{RouterSettings, SettingsStore};

/// Coarse model category used to pick a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelClass {
    Haiku,
    Main,
}

impl ModelClass {
    /// Classify a model identifier; anything mentioning "haiku" is the small class
    pub fn classify(model: &str) -> Self {
        if model.to_ascii_lowercase().contains("haiku") {
            ModelClass::Haiku
        } else {
            ModelClass::Main
        }
    }

    /// Classify the `model` field of a request body, defaulting to `Main`
    pub fn of_body(body: Option<&serde_json::Value>) -> Self {
        body.and_then(|b| b.get("model"))
            .and_then(|m| m.as_str())
            .map(Self::classify)
            .unwrap_or(ModelClass::Main)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelClass::Haiku => "haiku",
            ModelClass::Main => "main",
        }
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
