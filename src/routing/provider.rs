//! Provider registry
//!
//! Static knowledge about every backend the router can target: where it
//! lives, how it authenticates, and whether its process is supervised locally.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::settings::{ProviderSettings, ProvidersSettings};

/// How a provider expects its credential to be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    /// `x-api-key: <credential>`
    XApiKeyHeader,
    /// `Authorization: Bearer <credential>`, only when a credential is set
    BearerToken,
    /// Never attach an auth header
    None,
}

/// Where a provider is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Fixed remote base URL
    Remote(&'static str),
    /// Local process on the loopback interface, default port
    Supervised { default_port: u16 },
}

/// Known backend providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Glm,
    Kimi,
    Minimax,
    Deepseek,
    CliProxyApi,
    Copilot,
}

impl Provider {
    /// Every provider, in registry order
    pub const ALL: [Provider; 6] = [
        Provider::Glm,
        Provider::Kimi,
        Provider::Minimax,
        Provider::Deepseek,
        Provider::CliProxyApi,
        Provider::Copilot,
    ];

    /// Providers backed by a locally supervised process
    pub const SUPERVISED: [Provider; 2] = [Provider::CliProxyApi, Provider::Copilot];

    /// Name used in mapping strings, logs and metrics
    pub fn name(self) -> &'static str {
        match self {
            Provider::Glm => "glm",
            Provider::Kimi => "kimi",
            Provider::Minimax => "minimax",
            Provider::Deepseek => "deepseek",
            Provider::CliProxyApi => "cliproxyapi",
            Provider::Copilot => "copilot",
        }
    }

    pub fn endpoint(self) -> Endpoint {
        match self {
            Provider::Glm => Endpoint::Remote("https://open.bigmodel.cn/api/anthropic"),
            Provider::Kimi => Endpoint::Remote("https://api.moonshot.ai/anthropic"),
            Provider::Minimax => Endpoint::Remote("https://api.minimax.io/anthropic"),
            Provider::Deepseek => Endpoint::Remote("https://api.deepseek.com/anthropic"),
            Provider::CliProxyApi => Endpoint::Supervised { default_port: 8317 },
            Provider::Copilot => Endpoint::Supervised { default_port: 4141 },
        }
    }

    pub fn auth_method(self) -> AuthMethod {
        match self {
            Provider::Glm | Provider::Kimi | Provider::Minimax | Provider::Deepseek => {
                AuthMethod::XApiKeyHeader
            }
            Provider::CliProxyApi => AuthMethod::BearerToken,
            Provider::Copilot => AuthMethod::None,
        }
    }

    /// Whether the provider runs as a subprocess managed by the router
    pub fn is_supervised(self) -> bool {
        matches!(self.endpoint(), Endpoint::Supervised { .. })
    }

    /// Whether streamed responses from this provider need empty
    /// `content_block_start` events stripped
    pub fn normalizes_events(self) -> bool {
        matches!(self, Provider::CliProxyApi)
    }

    /// This provider's slice of the routing settings
    pub fn settings(self, providers: &ProvidersSettings) -> &ProviderSettings {
        match self {
            Provider::Glm => &providers.glm,
            Provider::Kimi => &providers.kimi,
            Provider::Minimax => &providers.minimax,
            Provider::Deepseek => &providers.deepseek,
            Provider::CliProxyApi => &providers.cliproxyapi,
            Provider::Copilot => &providers.copilot,
        }
    }

    /// Combine static registry data with the current settings
    pub fn descriptor(self, providers: &ProvidersSettings) -> ProviderDescriptor {
        let settings = self.settings(providers);
        let base_url = match self.endpoint() {
            Endpoint::Remote(url) => settings
                .endpoint
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .unwrap_or(url)
                .trim_end_matches('/')
                .to_string(),
            Endpoint::Supervised { default_port } => {
                format!("http://127.0.0.1:{}", settings.port.unwrap_or(default_port))
            }
        };

        ProviderDescriptor {
            provider: self,
            base_url,
            auth_method: self.auth_method(),
            enabled: settings.enabled,
            credential: settings
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            models: settings.models.clone(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a mapping names a provider the registry does not know
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Provider::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownProvider(wanted.to_string()))
    }
}

/// Everything the resolver needs to know about one provider, for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub provider: Provider,
    /// Base URL without trailing slash
    pub base_url: String,
    pub auth_method: AuthMethod,
    pub enabled: bool,
    /// Non-empty credential, if configured
    pub credential: Option<String>,
    /// Advisory model allow-list
    pub models: Vec<String>,
}
