use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::User;
use crate::error::{AccountError, AccountResult};

#[derive(Default)]
struct Tables {
    by_id: HashMap<Uuid, User>,
    id_by_username: HashMap<String, Uuid>,
}

/// Process-local store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Tables>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user as soft-deleted. Only reachable from tests, since no
    /// account flow deletes users.
    #[cfg(test)]
    pub async fn soft_delete(&self, id: Uuid) {
        if let Some(user) = self.inner.write().await.by_id.get_mut(&id) {
            user.is_deleted = true;
        }
    }

    #[cfg(test)]
    pub async fn set_status(&self, id: Uuid, status: crate::auth::repo_types::AccountStatus) {
        if let Some(user) = self.inner.write().await.by_id.get_mut(&id) {
            user.status = status;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> AccountResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .id_by_username
            .get(username)
            .and_then(|id| tables.by_id.get(id))
            .filter(|u| !u.is_deleted)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AccountResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.by_id.get(&id).filter(|u| !u.is_deleted).cloned())
    }

    async fn insert(&self, user: &User) -> AccountResult<Uuid> {
        // check and insert under one write lock
        let mut tables = self.inner.write().await;
        if tables.id_by_username.contains_key(&user.username) {
            return Err(AccountError::DuplicateUsername);
        }
        if tables.by_id.contains_key(&user.id) {
            return Err(anyhow::anyhow!("user id {} already present", user.id).into());
        }
        tables.id_by_username.insert(user.username.clone(), user.id);
        tables.by_id.insert(user.id, user.clone());
        Ok(user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::AccountStatus;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn user(username: &str) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: "$argon2id$fake".into(),
            email: format!("{username}@example.com"),
            display_name: username.into(),
            status: AccountStatus::Enabled,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_username_and_id() {
        let store = MemoryUserStore::new();
        let u = user("alice");
        let id = store.insert(&u).await.unwrap();
        assert_eq!(id, u.id);

        let by_name = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);
        let by_id = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let store = MemoryUserStore::new();
        store.insert(&user("alice")).await.unwrap();
        let err = store.insert(&user("alice")).await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateUsername));
    }

    #[tokio::test]
    async fn soft_deleted_users_are_invisible() {
        let store = MemoryUserStore::new();
        let id = store.insert(&user("alice")).await.unwrap();
        store.soft_delete(id).await;
        assert!(store.find_by_id(id).await.unwrap().is_none());
        assert!(store.find_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_username_yield_one_winner() {
        let store = Arc::new(MemoryUserStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.insert(&user("race")).await }));
        }
        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AccountError::DuplicateUsername) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
    }
}
