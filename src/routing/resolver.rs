//! Mapping resolution
//!
//! Turns the mapping string configured for a model class into a concrete
//! target. Every configuration problem (malformed mapping, unknown or disabled
//! provider, unusable credential) degrades to pass-through with a warning;
//! resolution never fails a request.

use axum::http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use tracing::warn;

use super::provider::{AuthMethod, Provider};
use super::settings::{RouterSettings, PASS};
use super::ModelClass;

/// Header name for API-key style providers
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// A provider credential shaped as the header it will be sent in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    name: HeaderName,
    value: HeaderValue,
}

impl Credential {
    /// Build the outbound auth header for `method`, if one should be attached
    pub fn for_method(
        method: AuthMethod,
        secret: Option<&str>,
    ) -> Result<Option<Self>, axum::http::header::InvalidHeaderValue> {
        let Some(secret) = secret else {
            return Ok(None);
        };

        let (name, raw) = match method {
            AuthMethod::XApiKeyHeader => (X_API_KEY, secret.to_string()),
            AuthMethod::BearerToken => (AUTHORIZATION, format!("Bearer {}", secret)),
            AuthMethod::None => return Ok(None),
        };

        let mut value = HeaderValue::from_str(&raw)?;
        value.set_sensitive(true);
        Ok(Some(Self { name, value }))
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.name
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.value
    }
}

/// Where one request goes, when a mapping applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub provider: Provider,
    /// Endpoint base URL without trailing slash
    pub base_url: String,
    /// Replacement for the body's `model` field
    pub model: Option<String>,
    pub auth_method: AuthMethod,
    pub credential: Option<Credential>,
}

/// Resolve the mapping for `class`; `None` means pass-through
pub fn resolve(class: ModelClass, settings: &RouterSettings) -> Option<ResolvedTarget> {
    let mapping = settings.mappings.for_class(class).trim();
    if mapping.eq_ignore_ascii_case(PASS) {
        return None;
    }

    let Some((name, model)) = mapping.split_once(':') else {
        warn!(model_class = %class, mapping = %mapping, "Malformed mapping, falling back to pass-through");
        return None;
    };

    let provider = match name.parse::<Provider>() {
        Ok(provider) => provider,
        Err(e) => {
            warn!(model_class = %class, mapping = %mapping, error = %e, "No mapping found, falling back to pass-through");
            return None;
        }
    };

    let descriptor = provider.descriptor(&settings.providers);
    if !descriptor.enabled {
        warn!(
            model_class = %class,
            provider = %provider,
            "Mapped provider is disabled, falling back to pass-through"
        );
        return None;
    }

    let model = Some(model.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    if let Some(model) = &model {
        if !descriptor.models.is_empty() && !descriptor.models.contains(model) {
            warn!(
                provider = %provider,
                model = %model,
                "Mapped model is not in the provider's model list"
            );
        }
    }

    let credential = match Credential::for_method(
        descriptor.auth_method,
        descriptor.credential.as_deref(),
    ) {
        Ok(credential) => credential,
        Err(_) => {
            warn!(
                provider = %provider,
                "Provider credential is not a valid header value, falling back to pass-through"
            );
            return None;
        }
    };

    Some(ResolvedTarget {
        provider,
        base_url: descriptor.base_url,
        model,
        auth_method: descriptor.auth_method,
        credential,
    })
}
