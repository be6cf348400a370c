//! API error types with HTTP response mapping.

use availability::{LockError, LockErrorKind};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ValidationError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or invalid caller identity.
    Unauthorized(String),
    /// State-transition or availability conflict.
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    /// Maps a lock error from hold or confirm: a missing lock is a conflict.
    pub fn from_lock(err: LockError) -> Self {
        match err.kind() {
            LockErrorKind::NotFound | LockErrorKind::Conflict => ApiError::Conflict(err.to_string()),
            LockErrorKind::Internal => ApiError::Internal(err.to_string()),
        }
    }

    /// Maps a lock error from release: a missing lock is a 404.
    pub fn from_release(err: LockError) -> Self {
        match err.kind() {
            LockErrorKind::NotFound => ApiError::NotFound(err.to_string()),
            _ => Self::from_lock(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
