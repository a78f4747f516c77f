use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::error::{AccountError, AccountResult};

/// Persistence boundary for user records.
///
/// Lookups return `Ok(None)` for a missing or soft-deleted user; the service
/// decides what that means for the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AccountResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AccountResult<Option<User>>;

    /// Fails with [`AccountError::DuplicateUsername`] when the username is taken.
    async fn insert(&self, user: &User) -> AccountResult<Uuid>;
}

const USER_COLUMNS: &str = "id, username, password_hash, email, display_name, status, is_deleted, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> AccountResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND NOT is_deleted"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("select user by username")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AccountResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND NOT is_deleted"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select user by id")?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> AccountResult<Uuid> {
        let res = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, username, password_hash, email, display_name,
                               status, is_deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.status)
        .bind(user.is_deleted)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e) => Err(AccountError::DuplicateUsername),
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
