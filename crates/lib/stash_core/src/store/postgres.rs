//! PostgreSQL credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::auth::{ApiKeyPermission, ApiKeyRecord, Role, User};

type UserRow = (
    Uuid,
    String,
    String,
    String,
    String,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

type KeyRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

/// PostgreSQL-backed [`CredentialStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: UserRow) -> Result<User, StoreError> {
    let (id, username, email, password_hash, role, is_active, created_at, updated_at, last_login_at) =
        row;
    let role =
        Role::parse(&role).ok_or_else(|| StoreError::Backend(format!("unknown role: {role}")))?;
    Ok(User {
        id,
        username,
        email,
        password_hash,
        role,
        is_active,
        created_at,
        updated_at,
        last_login_at,
    })
}

fn key_from_row(row: KeyRow) -> Result<ApiKeyRecord, StoreError> {
    let (id, user_id, key, name, permission, is_active, created_at, expires_at, last_used_at) = row;
    let permission = ApiKeyPermission::parse(&permission)
        .ok_or_else(|| StoreError::Backend(format!("unknown permission: {permission}")))?;
    Ok(ApiKeyRecord {
        id,
        user_id,
        key,
        name,
        permission,
        is_active,
        created_at,
        expires_at,
        last_used_at,
    })
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users \
             (id, username, email, password_hash, role, is_active, created_at, updated_at, last_login_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, role, is_active, \
                    created_at, updated_at, last_login_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, role, is_active, \
                    created_at, updated_at, last_login_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn user_count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_api_key(&self, record: &ApiKeyRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO api_keys \
             (id, user_id, key_value, name, permission, is_active, created_at, expires_at, last_used_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.key)
        .bind(&record.name)
        .bind(record.permission.as_str())
        .bind(record.is_active)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.last_used_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_api_key_by_value(&self, key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        let row = sqlx::query_as::<_, KeyRow>(
            "SELECT id, user_id, key_value, name, permission, is_active, \
                    created_at, expires_at, last_used_at \
             FROM api_keys WHERE key_value = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(key_from_row).transpose()
    }

    async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let rows = sqlx::query_as::<_, KeyRow>(
            "SELECT id, user_id, key_value, name, permission, is_active, \
                    created_at, expires_at, last_used_at \
             FROM api_keys \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(key_from_row).collect()
    }

    async fn deactivate_api_key(&self, user_id: Uuid, key_id: Uuid) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE api_keys SET is_active = FALSE WHERE id = $1 AND user_id = $2")
                .bind(key_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(key_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) \
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;
        Ok(revoked)
    }

    async fn purge_revoked_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
