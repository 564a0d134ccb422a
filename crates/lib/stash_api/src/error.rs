//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use stash_core::auth::AuthError;
use stash_core::store::StoreError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            // Internal detail stays in the logs, not in the response.
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "internal server error");
        }

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(m) => ApiError::Validation(m),
            StoreError::Backend(m) => ApiError::Internal(m),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::AuthenticationFailed => ApiError::Unauthorized("Invalid credentials".into()),
            // Every credential-verification failure collapses into one
            // indistinguishable 401.
            AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::MalformedToken
            | AuthError::InvalidApiKey => {
                ApiError::Unauthorized("Invalid or expired credentials".into())
            }
            AuthError::Forbidden => ApiError::Forbidden("Operation not permitted".into()),
            AuthError::NotFound => ApiError::NotFound("Resource not found".into()),
            AuthError::Store(e) => ApiError::from(e),
            AuthError::Internal(m) => ApiError::Internal(m),
        }
    }
}
