//! Token Handlers
//!
//! Issue, verify and introspect access tokens.

use aaa_core::{Constraints, Identity, TokenClaims};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::api::error::ApiError;
use crate::core::IssuedToken;

/// Request to issue an access token
#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    /// Caller as established by the upstream authentication step
    pub identity: Identity,

    pub resource_id: String,

    /// Optional narrowing of the granted constraints
    #[serde(default)]
    pub scope: Option<Constraints>,
}

/// Issue an access token
///
/// POST /v1/tokens
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IssueTokenRequest>, JsonRejection>,
) -> Result<Json<IssuedToken>, ApiError> {
    let Json(request) = payload?;
    let issued = state
        .issuer
        .issue_token(&request.identity, &request.resource_id, request.scope.as_ref())
        .await?;
    Ok(Json(issued))
}

/// A token to check
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Claims of a valid token
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub claims: TokenClaims,
}

/// Verify a token locally
///
/// POST /v1/tokens/verify
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    let claims = state.verifier.verify(&request.token)?;
    Ok(Json(TokenResponse { claims }))
}

/// Verify a token and re-check its policy
///
/// POST /v1/tokens/introspect
pub async fn introspect_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    let claims = state.verifier.introspect(&request.token).await?;
    Ok(Json(TokenResponse { claims }))
}
