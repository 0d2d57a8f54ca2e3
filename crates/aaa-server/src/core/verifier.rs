//! Token Verifier
//!
//! `verify` is purely local: signature, expiry and issuer. `introspect`
//! additionally loads the policy named in the token and checks it is still
//! active and admitting, so revoking it kills its tokens before they expire.

use aaa_core::{AaaError, PublicKey, Result, SignedClaims, TokenClaims};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::engine::PolicyEngine;

/// The token verifier
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    engine: Arc<PolicyEngine>,
    verification_key: PublicKey,
    issuer: String,
}

fn invalid(reason: impl Into<String>) -> AaaError {
    let reason = reason.into();
    warn!(reason = %reason, "Rejected access token");
    AaaError::InvalidToken(reason)
}

impl TokenVerifier {
    pub fn new(
        engine: Arc<PolicyEngine>,
        verification_key: PublicKey,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            verification_key,
            issuer: issuer.into(),
        }
    }

    /// Check signature, expiry and issuer
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        self.verify_at(token, Utc::now())
    }

    /// `verify` as of `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims> {
        let signed = SignedClaims::from_token(token).map_err(|e| invalid(e.to_string()))?;
        let claims = self
            .verification_key
            .verify_claims(&signed)
            .map_err(|e| invalid(e.to_string()))?;

        if claims.iss != self.issuer {
            return Err(invalid(format!("unexpected issuer '{}'", claims.iss)));
        }
        if !claims.is_live_at(now) {
            return Err(invalid(format!("token {} has expired", claims.jti)));
        }

        debug!(jti = %claims.jti, consumer_id = %claims.sub, "Verified access token");
        Ok(claims)
    }

    /// `verify`, then confirm the token's own policy still stands
    pub async fn introspect(&self, token: &str) -> Result<TokenClaims> {
        self.introspect_at(token, Utc::now()).await
    }

    pub async fn introspect_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims> {
        let claims = self.verify_at(token, now)?;

        let policy = self
            .engine
            .policy_in_force_at(claims.pid, &claims.sub, now)
            .await?;

        if policy.is_none() {
            warn!(jti = %claims.jti, policy_id = %claims.pid, "Token's policy no longer grants access");
            return Err(AaaError::Revoked(format!(
                "policy {} no longer grants access",
                claims.pid
            )));
        }

        Ok(claims)
    }
}
