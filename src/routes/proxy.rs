//! Proxy front door
//!
//! Every POST that does not hit an administrative route lands here. The body
//! is read in full, classified by its `model` field and sent to the target the
//! current settings map that class to, or to the default upstream.

use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::Method,
    response::Response,
};
use serde_json::Value;
use tracing::Instrument;

use crate::{
    audit::{MappingInfo, PendingAudit, RequestSnapshot},
    error::AppError,
    proxy::{build_envelope, relay_response, RequestContext},
    routes::metrics::record_request,
    routing::{resolve, ModelClass},
    AppState,
};

/// Fallback handler: proxy POSTs, refuse everything else
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    if parts.method != Method::POST {
        return Err(AppError::MethodNotAllowed(parts.method.to_string()));
    }

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();

    let body = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let settings = state.settings.snapshot().await;
    let parsed: Option<Value> = serde_json::from_slice(&body).ok();
    let class = ModelClass::of_body(parsed.as_ref());
    let original_model = parsed
        .as_ref()
        .and_then(|v| v.get("model"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let target = resolve(class, &settings);
    let mut ctx = RequestContext::new(&path_and_query, class).with_model(original_model.clone());
    if let Some(target) = &target {
        ctx = ctx.with_target(target.provider.name(), target.model.as_deref());
    }

    let span = ctx.create_span();
    async move {
        ctx.log_request_start();

        let envelope = build_envelope(
            &state.config.upstream_url,
            &path_and_query,
            &parts.headers,
            body,
            parsed,
            target.as_ref(),
        );

        let audit = settings.audit_logging.then(|| {
            let mapping = target.as_ref().map(|t| MappingInfo {
                original_model: original_model.clone(),
                resolved_model: t.model.clone().or_else(|| original_model.clone()),
                target_url: envelope.url.clone(),
                provider: t.provider,
                model_class: class,
            });
            PendingAudit::new(
                state.audit.clone(),
                RequestSnapshot::new(
                    &envelope.url,
                    Method::POST.as_str(),
                    &envelope.headers,
                    &envelope.body,
                    mapping,
                ),
            )
        });

        match state.forwarder.send(&envelope, &settings, &ctx).await {
            Ok(upstream) => Ok(relay_response(upstream, ctx, envelope.provider, audit)),
            Err(e) => {
                let message = e.to_string();
                ctx.log_error(&message);
                record_request(&ctx.provider, 0, ctx.elapsed_secs());
                if let Some(pending) = audit {
                    pending.submit(None, Some(message.clone())).await;
                }
                Err(AppError::Transport(message))
            }
        }
    }
    .instrument(span)
    .await
}

/// Non-GET requests to administrative routes
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}
