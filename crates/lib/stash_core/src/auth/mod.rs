//! Authentication and authorization logic.
//!
//! Provides password hashing, the signed-token codec, API key management,
//! the composite credential dispatcher, and the capability table.

pub mod api_keys;
pub mod capability;
pub mod dispatch;
pub mod password;
pub mod token;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login failed. Deliberately does not say why.
    #[error("Invalid credentials")]
    AuthenticationFailed,

    /// Token failed signature, kind, or subject checks.
    #[error("Invalid token")]
    InvalidToken,

    /// Token is past its expiry. No grace window.
    #[error("Token expired")]
    ExpiredToken,

    /// Token is not structurally a signed token at all.
    #[error("Malformed token")]
    MalformedToken,

    /// API key is unknown, revoked, or expired. Deliberately does not say which.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The authenticated scope does not grant the attempted operation.
    #[error("Operation not permitted")]
    Forbidden,

    /// The addressed resource does not exist for this caller.
    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
