//! HTTP routes.
//!
//! - `POST /api/pin-lsk`: pin an identity document, answer `{cid}`
//! - `GET /health`: liveness
//! - `GET /metrics`: Prometheus text exposition

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use haki_telemetry::metrics::PIN_REQUESTS;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::domain::{CorsConfig, Credentials, GatewayConfig, PinGatewayError, PinPayload};
use crate::ports::PinningService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pinner: Arc<dyn PinningService>,
    pub credentials: Option<Credentials>,
}

/// Build the gateway router with its middleware stack.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(&config.cors))
        .layer(MapResponseBodyLayer::new(axum::body::Body::new))
        .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes));

    Router::new()
        .route("/api/pin-lsk", post(pin_identity))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(middleware)
        .with_state(state)
}

/// CORS layer from gateway config
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-requested-with")])
        .max_age(Duration::from_secs(config.max_age));

    if config.allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

#[instrument(skip_all)]
async fn pin_identity(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = match parse_request(&body) {
        Ok(payload) => payload,
        Err(e) => return reject("none", e),
    };
    let kind = payload.kind.type_tag();

    let Some(credentials) = state.credentials.as_ref() else {
        return reject(kind, PinGatewayError::CredentialsNotConfigured);
    };

    match state.pinner.pin_json(&payload.to_document(), credentials).await {
        Ok(cid) => {
            PIN_REQUESTS.with_label_values(&[kind, StatusCode::OK.as_str()]).inc();
            info!(kind, cid = %cid, "Identity pinned");
            Json(json!({ "cid": cid })).into_response()
        }
        Err(e) => reject(kind, e),
    }
}

fn parse_request(body: &[u8]) -> Result<PinPayload, PinGatewayError> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|e| PinGatewayError::Internal(format!("malformed request body: {}", e)))?;
    PinPayload::from_request(&body, Utc::now())
}

fn reject(kind: &'static str, error: PinGatewayError) -> Response {
    let status = error.status();
    PIN_REQUESTS.with_label_values(&[kind, status.as_str()]).inc();
    match &error {
        PinGatewayError::Internal(cause) => warn!(kind, cause = %cause, "Server pin error"),
        other => warn!(kind, status = status.as_u16(), error = %other, "Pin request rejected"),
    }
    error.into_response()
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "pin-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> Response {
    match haki_telemetry::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
