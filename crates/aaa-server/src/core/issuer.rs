//! Token Issuer
//!
//! Turns an allow decision into a short-lived signed access token. The
//! token's constraints are the policy's constraints, optionally narrowed by
//! the caller; its lifetime never outlasts the policy.

use aaa_core::{
    constraints::TIME_WINDOW_KIND, AaaError, Constraint, Constraints, Identity, Result,
    TokenClaims, ACCESS_ACTION,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::engine::PolicyEngine;
use super::validation::validate_scope;
use crate::config::{validate_token_lifetime, DEFAULT_TOKEN_LIFETIME};
use crate::keys::KeyMaterial;

/// Issuer identity and token lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    issuer: String,
    lifetime: Duration,
}

impl TokenSettings {
    /// `issuer` must be non-empty; `lifetime` positive and at most 24 hours
    pub fn new(issuer: impl Into<String>, lifetime: Duration) -> Result<Self> {
        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(AaaError::FatalConfig("issuer domain cannot be empty".into()));
        }
        validate_token_lifetime(lifetime)?;
        Ok(Self { issuer, lifetime })
    }

    /// Settings with the default lifetime
    pub fn with_default_lifetime(issuer: impl Into<String>) -> Result<Self> {
        Self::new(issuer, DEFAULT_TOKEN_LIFETIME)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

/// A freshly minted access token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// The bearer token string
    pub token: String,
    pub claims: TokenClaims,
    pub expires_at: DateTime<Utc>,
}

/// The token issuer
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    engine: Arc<PolicyEngine>,
    keys: Arc<KeyMaterial>,
    settings: TokenSettings,
}

impl TokenIssuer {
    pub fn new(engine: Arc<PolicyEngine>, keys: Arc<KeyMaterial>, settings: TokenSettings) -> Self {
        Self {
            engine,
            keys,
            settings,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue a token for `identity` on `resource_id`
    ///
    /// Fails with `Authorization` when no policy allows access and with
    /// `Scope` when `requested_scope` exceeds the grant.
    pub async fn issue_token(
        &self,
        identity: &Identity,
        resource_id: &str,
        requested_scope: Option<&Constraints>,
    ) -> Result<IssuedToken> {
        self.issue_token_at(identity, resource_id, requested_scope, Utc::now())
            .await
    }

    pub async fn issue_token_at(
        &self,
        identity: &Identity,
        resource_id: &str,
        requested_scope: Option<&Constraints>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        if identity.consumer_id.trim().is_empty() {
            return Err(AaaError::Validation("consumer id cannot be empty".into()));
        }
        if resource_id.trim().is_empty() {
            return Err(AaaError::Validation("resource id cannot be empty".into()));
        }

        let decision = self
            .engine
            .verify_policy_at(&identity.consumer_id, resource_id, ACCESS_ACTION, now)
            .await?;

        let policy_id = match (decision.allow, decision.policy_id) {
            (true, Some(id)) => id,
            _ => {
                warn!(
                    consumer_id = %identity.consumer_id,
                    resource_id = %resource_id,
                    "Token refused: no policy allows access"
                );
                return Err(AaaError::Authorization(format!(
                    "'{}' has no access to '{}'",
                    identity.consumer_id, resource_id
                )));
            }
        };

        let granted = decision.constraints.unwrap_or_default();
        let constraints = match requested_scope {
            Some(requested) => {
                validate_scope(requested, &granted)?;
                granted.narrowed_by(requested)
            }
            None => granted,
        };

        let expires_at = token_expiry(now, self.settings.lifetime, decision.expires_at, &constraints)?;
        if expires_at <= now {
            return Err(AaaError::Authorization(
                "policy expires before a token could be used".into(),
            ));
        }

        let claims = TokenClaims {
            jti: Uuid::new_v4(),
            sub: identity.consumer_id.clone(),
            iss: self.settings.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            rid: resource_id.to_string(),
            pid: policy_id,
            role: identity.role,
            constraints,
        };

        // Whole-second claims can round exp down to iat
        if claims.exp <= claims.iat {
            return Err(AaaError::Authorization(
                "policy expires before a token could be used".into(),
            ));
        }

        let token = self
            .keys
            .signing_key()
            .sign_claims(&claims)
            .and_then(|signed| signed.to_token())
            .map_err(|e| AaaError::Internal(format!("failed to sign token: {}", e)))?;

        info!(
            jti = %claims.jti,
            consumer_id = %claims.sub,
            resource_id = %claims.rid,
            policy_id = %claims.pid,
            exp = claims.exp,
            "Issued access token"
        );

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at().unwrap_or(expires_at),
            claims,
        })
    }
}

/// `now + lifetime`, capped by the policy expiry and the end of any time window
fn token_expiry(
    now: DateTime<Utc>,
    lifetime: Duration,
    policy_expires_at: Option<DateTime<Utc>>,
    constraints: &Constraints,
) -> Result<DateTime<Utc>> {
    let lifetime = chrono::Duration::from_std(lifetime)
        .map_err(|e| AaaError::Internal(format!("token lifetime out of range: {}", e)))?;

    let mut expires_at = now + lifetime;
    if let Some(policy_exp) = policy_expires_at {
        expires_at = expires_at.min(policy_exp);
    }
    if let Some(Constraint::TimeWindow { not_after, .. }) = constraints.get(TIME_WINDOW_KIND) {
        expires_at = expires_at.min(*not_after);
    }
    Ok(expires_at)
}
