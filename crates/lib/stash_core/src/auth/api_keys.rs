//! API key management.
//!
//! Long-lived, permission-scoped keys for programmatic access. Keys are
//! stored verbatim and looked up by value; revocation is a soft flag.

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::warn;
use uuid::Uuid;

use super::{AuthError, capability};
use crate::models::auth::{ApiKeyPermission, ApiKeyRecord, User};
use crate::store::{CredentialStore, StoreError};
use crate::uuid::uuidv7;

/// Key length in characters.
pub const API_KEY_LEN: usize = 32;

/// Attempts before giving up when a generated value collides.
const MAX_GENERATE_ATTEMPTS: usize = 4;

/// Generate a random key (32 alphanumeric chars).
fn generate_key() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LEN)
        .map(char::from)
        .collect()
}

/// Create a new API key for `owner`. Returns (plaintext_key, record).
///
/// The plaintext is surfaced exactly once, here; listings redact it.
/// The requested permission must not grant anything the owner's own role
/// lacks. Uniqueness of the value is guaranteed by regenerating on insert
/// conflict.
pub async fn generate(
    store: &dyn CredentialStore,
    owner: &User,
    name: &str,
    permission: ApiKeyPermission,
    ttl: chrono::Duration,
) -> Result<(String, ApiKeyRecord), AuthError> {
    if !capability::role_covers(owner.role, permission) {
        return Err(AuthError::Forbidden);
    }

    let now = Utc::now();
    for _ in 0..MAX_GENERATE_ATTEMPTS {
        let record = ApiKeyRecord {
            id: uuidv7(),
            user_id: owner.id,
            key: generate_key(),
            name: name.to_string(),
            permission,
            is_active: true,
            created_at: now,
            expires_at: now + ttl,
            last_used_at: None,
        };
        match store.insert_api_key(&record).await {
            Ok(()) => {
                let plaintext = record.key.clone();
                return Ok((plaintext, record));
            }
            Err(StoreError::Conflict(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(AuthError::Internal(
        "api key generation kept colliding".into(),
    ))
}

/// Verify a presented API key. Returns the owning user and the key record.
///
/// Unknown, revoked, and expired keys all fail identically; the owner must
/// still be an active user. Usage is stamped fire-and-forget.
pub async fn verify(
    store: &dyn CredentialStore,
    presented: &str,
) -> Result<(User, ApiKeyRecord), AuthError> {
    let record = store
        .find_api_key_by_value(presented)
        .await?
        .ok_or(AuthError::InvalidApiKey)?;

    if !record.is_active || record.expires_at <= Utc::now() {
        return Err(AuthError::InvalidApiKey);
    }

    let user = store
        .find_user_by_id(record.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AuthError::InvalidApiKey)?;

    if let Err(e) = store.touch_api_key(record.id, Utc::now()).await {
        warn!(key_id = %record.id, error = %e, "failed to stamp api key usage");
    }

    Ok((user, record))
}

/// Soft-revoke a key owned by `owner_id`.
///
/// A key that does not exist and a key owned by someone else fail identically.
pub async fn revoke(
    store: &dyn CredentialStore,
    owner_id: Uuid,
    key_id: Uuid,
) -> Result<(), AuthError> {
    if store.deactivate_api_key(owner_id, key_id).await? {
        Ok(())
    } else {
        Err(AuthError::NotFound)
    }
}

/// List a user's keys, newest first.
///
/// Records carry the stored value; callers redact before exposure.
pub async fn list(
    store: &dyn CredentialStore,
    owner_id: Uuid,
) -> Result<Vec<ApiKeyRecord>, AuthError> {
    Ok(store.list_api_keys(owner_id).await?)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::auth::Role;
    use crate::store::MemoryStore;

    fn make_user(role: Role, active: bool) -> User {
        let now = Utc::now();
        let id = Uuid::new_v4();
        User {
            id,
            username: format!("user-{id}"),
            email: format!("{id}@example.com"),
            password_hash: "x".to_string(),
            role,
            is_active: active,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    async fn store_with(user: &User) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_user(user).await.unwrap();
        store
    }

    #[tokio::test]
    async fn generated_key_is_32_alphanumeric_chars() {
        let owner = make_user(Role::User, true);
        let store = store_with(&owner).await;

        let (plaintext, record) = generate(
            &store,
            &owner,
            "ci",
            ApiKeyPermission::ReadWrite,
            Duration::days(30),
        )
        .await
        .unwrap();

        assert_eq!(plaintext.len(), API_KEY_LEN);
        assert!(plaintext.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(record.user_id, owner.id);
        assert_eq!(record.permission, ApiKeyPermission::ReadWrite);
        assert!(record.is_active);

        let (user, verified) = verify(&store, &plaintext).await.unwrap();
        assert_eq!(user.id, owner.id);
        assert_eq!(verified.id, record.id);
    }

    #[tokio::test]
    async fn unknown_key_is_rejected() {
        let owner = make_user(Role::User, true);
        let store = store_with(&owner).await;

        assert!(matches!(
            verify(&store, "doesnotexistdoesnotexistdoesnot1").await,
            Err(AuthError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn revoked_key_is_rejected() {
        let owner = make_user(Role::User, true);
        let store = store_with(&owner).await;

        let (plaintext, record) = generate(
            &store,
            &owner,
            "ci",
            ApiKeyPermission::ReadOnly,
            Duration::days(30),
        )
        .await
        .unwrap();

        revoke(&store, owner.id, record.id).await.unwrap();
        assert!(matches!(
            verify(&store, &plaintext).await,
            Err(AuthError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn expired_key_is_rejected_even_while_active() {
        let owner = make_user(Role::User, true);
        let store = store_with(&owner).await;

        let now = Utc::now();
        let record = ApiKeyRecord {
            id: uuidv7(),
            user_id: owner.id,
            key: "expiredexpiredexpiredexpiredexp1".to_string(),
            name: "old".to_string(),
            permission: ApiKeyPermission::ReadOnly,
            is_active: true,
            created_at: now - Duration::days(60),
            expires_at: now - Duration::days(30),
            last_used_at: None,
        };
        store.insert_api_key(&record).await.unwrap();

        assert!(matches!(
            verify(&store, &record.key).await,
            Err(AuthError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn deactivated_owner_invalidates_keys() {
        let owner = make_user(Role::User, false);
        let store = store_with(&owner).await;

        let now = Utc::now();
        let record = ApiKeyRecord {
            id: uuidv7(),
            user_id: owner.id,
            key: "ownergoneownergoneownergoneowne1".to_string(),
            name: "orphaned".to_string(),
            permission: ApiKeyPermission::ReadOnly,
            is_active: true,
            created_at: now,
            expires_at: now + Duration::days(30),
            last_used_at: None,
        };
        store.insert_api_key(&record).await.unwrap();

        assert!(matches!(
            verify(&store, &record.key).await,
            Err(AuthError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn revoke_is_scoped_to_the_owner() {
        let owner = make_user(Role::User, true);
        let intruder = make_user(Role::User, true);
        let store = store_with(&owner).await;
        store.insert_user(&intruder).await.unwrap();

        let (_, record) = generate(
            &store,
            &owner,
            "mine",
            ApiKeyPermission::ReadOnly,
            Duration::days(30),
        )
        .await
        .unwrap();

        assert!(matches!(
            revoke(&store, intruder.id, record.id).await,
            Err(AuthError::NotFound)
        ));
        revoke(&store, owner.id, record.id).await.unwrap();
    }

    #[tokio::test]
    async fn permission_cannot_outrank_owner_role() {
        let store = MemoryStore::new();
        let user = make_user(Role::User, true);
        let read_only = make_user(Role::ReadOnly, true);
        let admin = make_user(Role::Admin, true);
        for u in [&user, &read_only, &admin] {
            store.insert_user(u).await.unwrap();
        }

        assert!(matches!(
            generate(&store, &user, "k", ApiKeyPermission::FullAccess, Duration::days(1)).await,
            Err(AuthError::Forbidden)
        ));
        assert!(matches!(
            generate(&store, &read_only, "k", ApiKeyPermission::ReadWrite, Duration::days(1)).await,
            Err(AuthError::Forbidden)
        ));
        assert!(
            generate(&store, &admin, "k", ApiKeyPermission::FullAccess, Duration::days(1))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn verify_stamps_usage() {
        let owner = make_user(Role::User, true);
        let store = store_with(&owner).await;

        let (plaintext, record) = generate(
            &store,
            &owner,
            "ci",
            ApiKeyPermission::ReadOnly,
            Duration::days(30),
        )
        .await
        .unwrap();
        assert!(record.last_used_at.is_none());

        verify(&store, &plaintext).await.unwrap();

        let listed = list(&store, owner.id).await.unwrap();
        assert!(listed[0].last_used_at.is_some());
    }
}
