//! Access token claim set

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constraints::Constraints;
use crate::error::{AaaError, Result};
use crate::types::Role;

/// Claims carried by an access token
///
/// Never stored server-side. Validity is bounded by `exp` and, for
/// introspection-aware callers, by the policy named in `pid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Token id
    pub jti: Uuid,

    /// Subject: the consumer the token was issued to
    pub sub: String,

    /// Issuer domain
    pub iss: String,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expires at (Unix seconds); the token is valid strictly before this
    pub exp: i64,

    /// Resource the token grants access to
    pub rid: String,

    /// Policy the token was derived from
    pub pid: Uuid,

    pub role: Role,

    #[serde(default)]
    pub constraints: Constraints,
}

impl TokenClaims {
    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| AaaError::Internal(e.to_string()))
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| AaaError::InvalidToken(format!("malformed claims: {}", e)))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Whether the token is still inside its lifetime at `now`
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.exp
    }
}
