// In-memory user store, used when no DATABASE_URL is configured and in tests
//
// Each operation takes the write lock for its whole read-modify-write, which
// gives the same per-document atomicity as a single UPDATE.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    error::StoreError,
    models::{NewUser, ProfileUpdate, SessionRecord, User},
    repository::UserStore,
};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| same_email(&u.email, email)).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| same_email(&u.email, email)))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| same_email(&u.email, &new_user.email)) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            is_active: true,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone: new_user.phone,
            bio: None,
            company_name: new_user.company_name,
            sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(first_name) = &update.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.clone();
        }
        if update.phone.is_some() {
            user.phone = update.phone.clone();
        }
        if update.bio.is_some() {
            user.bio = update.bio.clone();
        }
        if update.company_name.is_some() {
            user.company_name = update.company_name.clone();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.sessions.clear();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn deactivate_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(user) => {
                user.is_active = false;
                user.sessions.clear();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn push_session(&self, id: Uuid, record: SessionRecord) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(user) if user.is_active => {
                user.sessions.push(record);
                true
            }
            _ => false,
        })
    }

    async fn pull_session(&self, id: Uuid, token_hash: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        let before = user.sessions.len();
        user.sessions.retain(|s| s.token_hash != token_hash);
        Ok(user.sessions.len() != before)
    }

    async fn clear_sessions(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.sessions.clear();
        }
        Ok(())
    }

    async fn prune_sessions(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.sessions.retain(|s| !s.is_expired_at(now));
        }
        Ok(())
    }

    async fn has_session(&self, id: Uuid, token_hash: &str) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .get(&id)
            .map(|u| u.sessions.iter().any(|s| s.token_hash == token_hash))
            .unwrap_or(false))
    }

    async fn swap_session(
        &self,
        id: Uuid,
        old_hash: &str,
        record: SessionRecord,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        if !user.is_active {
            return Ok(false);
        }
        let Some(position) = user.sessions.iter().position(|s| s.token_hash == old_hash) else {
            return Ok(false);
        };
        user.sessions.remove(position);
        user.sessions.push(record);
        Ok(true)
    }
}
