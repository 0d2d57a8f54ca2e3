//! API module for the control plane server

pub mod error;
pub mod handlers;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub kid: String,
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
///
/// Not ready while the policy store is unreachable.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    let store_error = match state.engine.ping().await {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            Some(e.message().to_string())
        }
    };

    let status = if store_error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            ready: store_error.is_none(),
            kid: state.keys.kid().to_string(),
            issuer: state.issuer.settings().issuer().to_string(),
            store_error,
        }),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Policy endpoints
        .route(
            "/v1/policies",
            post(handlers::create_policies).get(handlers::list_policies),
        )
        .route("/v1/policies/verify", post(handlers::verify_policy))
        .route("/v1/policies/revoke", post(handlers::revoke_policies))
        // Token endpoints
        .route("/v1/tokens", post(handlers::issue_token))
        .route("/v1/tokens/verify", post(handlers::verify_token))
        .route("/v1/tokens/introspect", post(handlers::introspect_token))
        // Key endpoints
        .route("/v1/keys/verification", get(handlers::verification_key))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
