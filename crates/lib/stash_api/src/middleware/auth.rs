//! Authentication middleware.
//!
//! Pulls the credential headers off the request, runs the composite
//! dispatcher, and injects the resolved [`Principal`] as a request
//! extension for handlers to consume.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use stash_core::auth::dispatch::{Authenticator, RequestCredentials};
use stash_core::models::auth::Principal;

use crate::AppState;
use crate::config::ApiConfig;
use crate::error::ApiError;

/// Extension wrapper for the resolved caller identity.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Pull the two credential headers out of a request.
///
/// Absent and blank values count as not presented. Anything else goes
/// through verbatim for the dispatcher to judge.
pub fn extract_credentials(config: &ApiConfig, headers: &HeaderMap) -> RequestCredentials {
    let api_key = headers
        .get(config.api_key_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    RequestCredentials { api_key, bearer }
}

/// Resolve the caller or fail the request with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = extract_credentials(&state.config, request.headers());

    let authenticator = Authenticator::new(&state.codec, state.store.as_ref());
    let principal = authenticator
        .authenticate(&credentials)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Missing credentials".into()))?;

    request
        .extensions_mut()
        .insert(AuthenticatedPrincipal(principal));

    Ok(next.run(request).await)
}
