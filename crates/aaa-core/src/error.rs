//! Error taxonomy for the AAA control plane

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AaaError
pub type Result<T> = std::result::Result<T, AaaError>;

/// Stable machine-readable error kind
///
/// Every failure surfaced to a caller maps to exactly one kind so the caller
/// can tell "retry later" from "never allowed" from "was allowed, now isn't".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    NotFound,
    Conflict,
    #[serde(rename = "AUTHORIZATION_ERROR")]
    Authorization,
    #[serde(rename = "SCOPE_ERROR")]
    Scope,
    InvalidToken,
    Revoked,
    #[serde(rename = "STORE_ERROR")]
    Store,
    FatalConfig,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorKind {
    /// Code string used in API responses and batch outcomes
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
            ErrorKind::Scope => "SCOPE_ERROR",
            ErrorKind::InvalidToken => "INVALID_TOKEN",
            ErrorKind::Revoked => "REVOKED",
            ErrorKind::Store => "STORE_ERROR",
            ErrorKind::FatalConfig => "FATAL_CONFIG",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Store)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors that can occur in the AAA control plane
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AaaError {
    /// Malformed or missing request fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown resource or policy
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate active policy for a triple
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Policy denies the requested access
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Requested scope exceeds the granted constraints
    #[error("Scope exceeds grant: {0}")]
    Scope(String),

    /// Bad signature, expired token or wrong issuer
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token is intact but its backing policy is no longer active
    #[error("Token revoked: {0}")]
    Revoked(String),

    /// Transient backend failure, retryable
    #[error("Store error: {0}")]
    Store(String),

    /// Boot-time configuration or key material failure
    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),

    /// Unexpected failure that is neither the caller's nor the backend's fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AaaError {
    /// The stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AaaError::Validation(_) => ErrorKind::Validation,
            AaaError::NotFound(_) => ErrorKind::NotFound,
            AaaError::Conflict(_) => ErrorKind::Conflict,
            AaaError::Authorization(_) => ErrorKind::Authorization,
            AaaError::Scope(_) => ErrorKind::Scope,
            AaaError::InvalidToken(_) => ErrorKind::InvalidToken,
            AaaError::Revoked(_) => ErrorKind::Revoked,
            AaaError::Store(_) => ErrorKind::Store,
            AaaError::FatalConfig(_) => ErrorKind::FatalConfig,
            AaaError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            AaaError::Validation(m)
            | AaaError::NotFound(m)
            | AaaError::Conflict(m)
            | AaaError::Authorization(m)
            | AaaError::Scope(m)
            | AaaError::InvalidToken(m)
            | AaaError::Revoked(m)
            | AaaError::Store(m)
            | AaaError::FatalConfig(m)
            | AaaError::Internal(m) => m,
        }
    }
}
