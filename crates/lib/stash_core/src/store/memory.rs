//! In-memory credential store.
//!
//! Backs the integration tests and local development runs. PostgreSQL is the
//! production backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::auth::{ApiKeyRecord, User};

/// DashMap-backed [`CredentialStore`].
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    api_keys: DashMap<Uuid, ApiKeyRecord>,
    revoked_tokens: DashMap<Uuid, DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' already exists",
                user.email
            )));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.value().clone()))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.users.iter().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.users.iter().any(|u| u.email == email))
    }

    async fn user_count(&self) -> Result<i64, StoreError> {
        Ok(self.users.len() as i64)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.last_login_at = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn insert_api_key(&self, record: &ApiKeyRecord) -> Result<(), StoreError> {
        if self.api_keys.iter().any(|k| k.key == record.key) {
            return Err(StoreError::Conflict("api key value already exists".into()));
        }
        self.api_keys.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_api_key_by_value(&self, key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        Ok(self
            .api_keys
            .iter()
            .find(|k| k.key == key)
            .map(|k| k.value().clone()))
    }

    async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let mut keys: Vec<ApiKeyRecord> = self
            .api_keys
            .iter()
            .filter(|k| k.user_id == user_id)
            .map(|k| k.value().clone())
            .collect();
        keys.sort_by_key(|k| std::cmp::Reverse((k.created_at, k.id)));
        Ok(keys)
    }

    async fn deactivate_api_key(&self, user_id: Uuid, key_id: Uuid) -> Result<bool, StoreError> {
        match self.api_keys.get_mut(&key_id) {
            Some(mut key) if key.user_id == user_id => {
                key.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut key) = self.api_keys.get_mut(&key_id) {
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.revoked_tokens.entry(jti).or_insert(expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(self.revoked_tokens.contains_key(&jti))
    }

    async fn purge_revoked_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let before = self.revoked_tokens.len();
        self.revoked_tokens.retain(|_, expires_at| *expires_at >= now);
        Ok((before - self.revoked_tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::auth::{ApiKeyPermission, Role};

    fn user(name: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "x".to_string(),
            role: Role::User,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    fn key(user_id: Uuid, value: &str, created_at: DateTime<Utc>) -> ApiKeyRecord {
        ApiKeyRecord {
            id: crate::uuid::uuidv7(),
            user_id,
            key: value.to_string(),
            name: "test".to_string(),
            permission: ApiKeyPermission::ReadOnly,
            is_active: true,
            created_at,
            expires_at: created_at + Duration::days(30),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(&user("alice")).await.unwrap();

        let mut dup = user("alice");
        dup.email = "other@example.com".to_string();
        assert!(matches!(
            store.insert_user(&dup).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_key_value_conflicts() {
        let store = MemoryStore::new();
        let owner = user("bob");
        store.insert_user(&owner).await.unwrap();

        let now = Utc::now();
        store.insert_api_key(&key(owner.id, "samevalue", now)).await.unwrap();
        assert!(matches!(
            store.insert_api_key(&key(owner.id, "samevalue", now)).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn keys_list_newest_first() {
        let store = MemoryStore::new();
        let owner = user("carol");
        store.insert_user(&owner).await.unwrap();

        let base = Utc::now();
        store.insert_api_key(&key(owner.id, "older", base)).await.unwrap();
        store
            .insert_api_key(&key(owner.id, "newer", base + Duration::seconds(5)))
            .await
            .unwrap();

        let keys = store.list_api_keys(owner.id).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].key, "newer");
        assert_eq!(keys[1].key, "older");
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store
            .revoke_token(Uuid::new_v4(), now - Duration::hours(1))
            .await
            .unwrap();
        let live = Uuid::new_v4();
        store.revoke_token(live, now + Duration::hours(1)).await.unwrap();

        let purged = store.purge_revoked_tokens(now).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.is_token_revoked(live).await.unwrap());
    }
}
