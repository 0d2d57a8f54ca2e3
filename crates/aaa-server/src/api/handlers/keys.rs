//! Verification Key Handler
//!
//! Resource servers fetch the public key once and verify tokens locally.

use aaa_core::SerializablePublicKey;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

/// Published verification key
#[derive(Debug, Serialize)]
pub struct VerificationKeyResponse {
    /// Issuer domain tokens are stamped with
    pub issuer: String,

    #[serde(flatten)]
    pub key: SerializablePublicKey,
}

/// Get the token verification key
///
/// GET /v1/keys/verification
pub async fn verification_key(State(state): State<Arc<AppState>>) -> Json<VerificationKeyResponse> {
    Json(VerificationKeyResponse {
        issuer: state.issuer.settings().issuer().to_string(),
        key: state.keys.published_key(),
    })
}
