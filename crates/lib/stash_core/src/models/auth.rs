//! Credential domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! bodies in `stash_api` (which carry `#[serde(rename)]` for camelCase etc.).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role, assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
    ReadOnly,
}

impl Role {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
            Role::ReadOnly => "READ_ONLY",
        }
    }

    /// Parse the storage string form.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            "READ_ONLY" => Some(Role::ReadOnly),
            _ => None,
        }
    }
}

/// Permission scope carried by an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyPermission {
    ReadOnly,
    ReadWrite,
    FullAccess,
}

impl ApiKeyPermission {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyPermission::ReadOnly => "READ_ONLY",
            ApiKeyPermission::ReadWrite => "READ_WRITE",
            ApiKeyPermission::FullAccess => "FULL_ACCESS",
        }
    }

    /// Parse the storage string form.
    pub fn parse(s: &str) -> Option<ApiKeyPermission> {
        match s {
            "READ_ONLY" => Some(ApiKeyPermission::ReadOnly),
            "READ_WRITE" => Some(ApiKeyPermission::ReadWrite),
            "FULL_ACCESS" => Some(ApiKeyPermission::FullAccess),
            _ => None,
        }
    }
}

/// Domain user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never the plaintext.
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// API key record stored in the database.
///
/// `key` holds the opaque credential value itself. It is surfaced exactly
/// once at generation time and redacted everywhere else.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key: String,
    pub name: String,
    pub permission: ApiKeyPermission,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Token kind. Checked on every verification, never inferred from context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Client class presented at login. Drives token lifetimes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientType {
    Cli,
    #[default]
    Web,
}

/// Signed claims embedded in access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject, the user ID (standard JWT `sub` claim).
    pub sub: Uuid,
    /// Whether this is the access or the refresh half of a pair.
    pub kind: TokenKind,
    /// Client class the pair was issued for.
    pub client: ClientType,
    /// Unique token id. Refresh rotation denylists it.
    pub jti: Uuid,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Freshly issued access + refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Authorization scope bound to a request. Derived from exactly one
/// credential source; role and key scopes are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Role(Role),
    ApiKey(ApiKeyPermission),
}

/// Authenticated caller: the resolved user plus the scope of the credential
/// that authenticated the request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub scope: Scope,
}
