//! Server configuration loaded from environment variables.

use axum_extra::extract::cookie::SameSite;
use thiserror::Error;

use stash_core::auth::token::MIN_SECRET_BYTES;

/// Header carrying the API key credential.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Configuration problems that keep the server from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET is required")]
    MissingJwtSecret,

    #[error("JWT_SECRET must be at least {min} bytes, got {got}")]
    JwtSecretTooShort { min: usize, got: usize },

    #[error("API_KEY_HEADER must not be empty")]
    EmptyApiKeyHeader,

    #[error("COOKIE_SAME_SITE must be Strict, Lax, or None, got '{0}'")]
    InvalidSameSite(String),

    #[error("COOKIE_SECURE must be true or false, got '{0}'")]
    InvalidCookieSecure(String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Secret for signing and verifying tokens.
    pub jwt_secret: String,
    /// Header name checked for API key credentials.
    pub api_key_header: String,
    /// SameSite policy for the refresh cookie.
    pub cookie_same_site: SameSite,
    /// Whether the refresh cookie is marked Secure.
    pub cookie_secure: bool,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable           | Default                           |
    /// |--------------------|-----------------------------------|
    /// | `BIND_ADDR`        | `127.0.0.1:3300`                  |
    /// | `DATABASE_URL`     | `postgres://localhost:5432/stash` |
    /// | `JWT_SECRET`       | required, at least 32 bytes       |
    /// | `API_KEY_HEADER`   | `X-API-Key`                       |
    /// | `COOKIE_SAME_SITE` | `Strict`                          |
    /// | `COOKIE_SECURE`    | `true`                            |
    ///
    /// Validation failures are fatal. The server refuses to start with a
    /// weak secret or an unparseable cookie policy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingJwtSecret)?;
        validate_jwt_secret(&jwt_secret)?;

        let api_key_header =
            std::env::var("API_KEY_HEADER").unwrap_or_else(|_| DEFAULT_API_KEY_HEADER.to_string());
        if api_key_header.trim().is_empty() {
            return Err(ConfigError::EmptyApiKeyHeader);
        }

        let cookie_same_site = match std::env::var("COOKIE_SAME_SITE") {
            Ok(raw) => parse_same_site(&raw)?,
            Err(_) => SameSite::Strict,
        };

        let cookie_secure = match std::env::var("COOKIE_SECURE") {
            Ok(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidCookieSecure(raw))?,
            Err(_) => true,
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3300".to_string()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/stash".to_string()),
            jwt_secret,
            api_key_header,
            cookie_same_site,
            cookie_secure,
        })
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SECRET_BYTES {
        return Err(ConfigError::JwtSecretTooShort {
            min: MIN_SECRET_BYTES,
            got: secret.len(),
        });
    }
    Ok(())
}

fn parse_same_site(raw: &str) -> Result<SameSite, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        _ => Err(ConfigError::InvalidSameSite(raw.to_string())),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
