//! Refresh-token cookie construction.
//!
//! The refresh token travels only in an httpOnly cookie, never in a JSON
//! body. Attributes come from configuration so deployments behind plain
//! HTTP during development can relax `Secure`.

use axum_extra::extract::cookie::Cookie;
use time::Duration;

use stash_core::auth::token;
use stash_core::models::auth::{ClientType, TokenKind};

use crate::config::ApiConfig;

/// Cookie holding the refresh token.
pub const REFRESH_COOKIE: &str = "stash_refresh";

/// Build the refresh cookie for a freshly issued pair.
///
/// Max-Age tracks the refresh lifetime of the pair's client class, so the
/// browser drops the cookie when the token inside it dies.
pub fn refresh_cookie(
    config: &ApiConfig,
    token_value: &str,
    client: ClientType,
) -> Cookie<'static> {
    let max_age = token::lifetime(TokenKind::Refresh, client).num_seconds();
    Cookie::build((REFRESH_COOKIE.to_string(), token_value.to_string()))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(config.cookie_same_site)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age))
        .build()
}

/// Build an already-expired cookie that clears the refresh token.
pub fn clear_refresh_cookie(config: &ApiConfig) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(config.cookie_same_site)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}
