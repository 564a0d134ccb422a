//! Credential persistence seam.
//!
//! The auth services talk to storage through [`CredentialStore`] so the same
//! flows run against PostgreSQL in production and an in-memory map in tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{ApiKeyRecord, User};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e
            && db.is_unique_violation()
        {
            return StoreError::Conflict(db.to_string());
        }
        StoreError::Backend(e.to_string())
    }
}

/// Persistence operations for users, API keys, and the refresh-token denylist.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // Users

    /// Insert a new user. Fails with [`StoreError::Conflict`] when the
    /// username or email is already taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    async fn user_count(&self) -> Result<i64, StoreError>;

    /// Stamp `last_login_at` (and `updated_at`) for a user.
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    // API keys

    /// Insert a new API key. Fails with [`StoreError::Conflict`] when the key
    /// value collides with an existing one; callers regenerate and retry.
    async fn insert_api_key(&self, record: &ApiKeyRecord) -> Result<(), StoreError>;

    /// Equality lookup by the opaque key value itself.
    async fn find_api_key_by_value(&self, key: &str) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// All keys owned by a user, newest first.
    async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<ApiKeyRecord>, StoreError>;

    /// Soft-revoke a key owned by `user_id`. Returns `false` when no such key
    /// exists for that owner.
    async fn deactivate_api_key(&self, user_id: Uuid, key_id: Uuid) -> Result<bool, StoreError>;

    /// Stamp `last_used_at` for a key.
    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    // Refresh-token denylist

    /// Denylist a refresh token id. Idempotent. `expires_at` is the token's
    /// own expiry so the entry can be purged once it would die anyway.
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, StoreError>;

    /// Drop denylist entries whose tokens expired before `now`.
    /// Returns the number of entries removed.
    async fn purge_revoked_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
