//! API error types and responses

use aaa_core::{AaaError, ErrorKind};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be read
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A control-plane error
    #[error(transparent)]
    Aaa(#[from] AaaError),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// HTTP status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Authorization | ErrorKind::Scope => StatusCode::FORBIDDEN,
        ErrorKind::InvalidToken | ErrorKind::Revoked => StatusCode::UNAUTHORIZED,
        ErrorKind::Store => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::FatalConfig | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorKind::Validation.code(),
                msg.clone(),
                None,
            ),
            ApiError::Aaa(err) => {
                let kind = err.kind();
                let details = kind
                    .is_retryable()
                    .then(|| serde_json::json!({ "retryable": true }));
                (status_for(kind), kind.code(), err.message().to_string(), details)
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
