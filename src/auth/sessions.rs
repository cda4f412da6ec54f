// Session store: the per-user set of refresh tokens that are still honored
//
// A refresh token is self-contained, so a valid signature alone cannot be
// revoked. Membership here is what makes logout and logout-all effective.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{error::StoreError, models::SessionRecord, repository::UserStore};

/// Session operations over a user's session records
#[derive(Clone)]
pub struct SessionStore {
    users: Arc<dyn UserStore>,
}

impl SessionStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Hash a token using SHA-256; only digests are persisted
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Record a newly issued refresh token
    ///
    /// Returns false when the user no longer exists or is inactive; no
    /// record is written in that case.
    pub async fn add(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let record = SessionRecord {
            token_hash: Self::hash_token(token),
            expires_at,
            created_at: Utc::now(),
        };
        self.users.push_session(user_id, record).await
    }

    /// Drop the record for this token; absent records are not an error
    pub async fn remove(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let removed = self
            .users
            .pull_session(user_id, &Self::hash_token(token))
            .await?;
        debug!("Session removal for user {}: removed={}", user_id, removed);
        Ok(removed)
    }

    /// Drop every record for the user
    pub async fn remove_all(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.users.clear_sessions(user_id).await
    }

    /// Drop records whose expiry has passed
    pub async fn prune_expired(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.users.prune_sessions(user_id, Utc::now()).await
    }

    /// Whether this token was issued to the user and not yet revoked
    pub async fn contains(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        self.users
            .has_session(user_id, &Self::hash_token(token))
            .await
    }

    /// Atomically replace `old_token` with `new_token`
    ///
    /// Fails (false) if `old_token` was already revoked, so a replayed token
    /// cannot mint a second successor.
    pub async fn rotate(
        &self,
        user_id: Uuid,
        old_token: &str,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let record = SessionRecord {
            token_hash: Self::hash_token(new_token),
            expires_at,
            created_at: Utc::now(),
        };
        self.users
            .swap_session(user_id, &Self::hash_token(old_token), record)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryUserStore;
    use crate::auth::models::{NewUser, Role};
    use chrono::Duration;

    async fn store_with_user() -> (Arc<MemoryUserStore>, SessionStore, Uuid) {
        let users = Arc::new(MemoryUserStore::new());
        let user = users
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Applicant,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone: None,
                company_name: None,
            })
            .await
            .unwrap();
        let sessions = SessionStore::new(users.clone());
        (users, sessions, user.id)
    }

    #[test]
    fn test_hash_token_is_stable_sha256_hex() {
        let hash = SessionStore::hash_token("token");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, SessionStore::hash_token("token"));
        assert_ne!(hash, SessionStore::hash_token("token2"));
    }

    #[tokio::test]
    async fn test_add_contains_remove() {
        let (users, sessions, user_id) = store_with_user().await;
        let expires = Utc::now() + Duration::days(7);

        assert!(sessions.add(user_id, "refresh-1", expires).await.unwrap());
        assert!(sessions.contains(user_id, "refresh-1").await.unwrap());
        assert!(!sessions.contains(user_id, "refresh-2").await.unwrap());

        let stored = users.find_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(stored.sessions.len(), 1);
        assert_ne!(stored.sessions[0].token_hash, "refresh-1");

        assert!(sessions.remove(user_id, "refresh-1").await.unwrap());
        assert!(!sessions.remove(user_id, "refresh-1").await.unwrap());
        assert!(!sessions.contains(user_id, "refresh-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_for_unknown_user_is_refused() {
        let (_, sessions, _) = store_with_user().await;
        let added = sessions
            .add(Uuid::new_v4(), "refresh", Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert!(!added);
    }

    #[tokio::test]
    async fn test_prune_expired_only_drops_expired() {
        let (users, sessions, user_id) = store_with_user().await;
        sessions
            .add(user_id, "stale", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        sessions
            .add(user_id, "fresh", Utc::now() + Duration::days(1))
            .await
            .unwrap();

        sessions.prune_expired(user_id).await.unwrap();

        assert!(!sessions.contains(user_id, "stale").await.unwrap());
        assert!(sessions.contains(user_id, "fresh").await.unwrap());
        let stored = users.find_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(stored.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_all() {
        let (_, sessions, user_id) = store_with_user().await;
        let expires = Utc::now() + Duration::days(1);
        sessions.add(user_id, "a", expires).await.unwrap();
        sessions.add(user_id, "b", expires).await.unwrap();

        sessions.remove_all(user_id).await.unwrap();

        assert!(!sessions.contains(user_id, "a").await.unwrap());
        assert!(!sessions.contains(user_id, "b").await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_is_single_use() {
        let (_, sessions, user_id) = store_with_user().await;
        let expires = Utc::now() + Duration::days(1);
        sessions.add(user_id, "old", expires).await.unwrap();

        assert!(sessions.rotate(user_id, "old", "new", expires).await.unwrap());
        assert!(!sessions.rotate(user_id, "old", "other", expires).await.unwrap());
        assert!(sessions.contains(user_id, "new").await.unwrap());
        assert!(!sessions.contains(user_id, "old").await.unwrap());
        assert!(!sessions.contains(user_id, "other").await.unwrap());
    }
}
