//! User repository
//!
//! Accounts are stored like any other [`Entity`]; the lookups used by
//! registration, login and password reset are layered on top of the
//! generic repository.

use crate::db::DynDatabasePool;
use crate::models::{User, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::entity::{Entity, RowReader, SqlValue};
use super::repository::{Repository, SqlxRepository};

impl Entity for User {
    const TABLE: &'static str = "users";
    const SELECT: &'static str =
        "SELECT t.id, t.name, t.email, t.password_hash, t.status, t.token FROM users t";
    const COLUMNS: &'static [&'static str] = &["name", "email", "password_hash", "status", "token"];

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.email.clone()),
            SqlValue::Text(self.password_hash.clone()),
            SqlValue::Int(self.status.as_i64()),
            SqlValue::OptText(self.token.clone()),
        ]
    }

    fn from_row(row: &dyn RowReader) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
            email: row.text("email")?,
            password_hash: row.text("password_hash")?,
            status: UserStatus::from_i64(row.int("status")?),
            token: row.opt_text("token")?,
        })
    }
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new user
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Any user with this email, whatever the status
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Active user with this email
    async fn get_active_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Pending user holding this verification token
    async fn get_pending_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Active user holding this password-reset token
    async fn get_active_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Persist changed fields of an existing user
    async fn update(&self, user: &User) -> Result<User>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    inner: SqlxRepository<User>,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            inner: SqlxRepository::new(pool),
        }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_with_status(
        &self,
        column: &str,
        value: &str,
        status: UserStatus,
    ) -> Result<Option<User>> {
        let condition = format!("t.{} = ? AND t.status = ?", column);
        self.inner
            .find_first(
                &condition,
                vec![
                    SqlValue::Text(value.to_string()),
                    SqlValue::Int(status.as_i64()),
                ],
            )
            .await
            .with_context(|| format!("Failed to get {} user by {}", status, column))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        self.inner.add(user).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner
            .find_first("t.email = ?", vec![SqlValue::Text(email.to_string())])
            .await
            .context("Failed to get user by email")
    }

    async fn get_active_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_with_status("email", email, UserStatus::Active).await
    }

    async fn get_pending_by_token(&self, token: &str) -> Result<Option<User>> {
        self.find_with_status("token", token, UserStatus::Pending).await
    }

    async fn get_active_by_token(&self, token: &str) -> Result<Option<User>> {
        self.find_with_status("token", token, UserStatus::Active).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        self.inner.update(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn create_test_user(email: &str, token: &str) -> User {
        User::new(
            "Test User".to_string(),
            email.to_string(),
            "hash".to_string(),
            token.to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_user() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&create_test_user("a@example.com", "tok_1"))
            .await
            .expect("Failed to create user");

        assert!(created.id > 0);
        assert_eq!(created.status, UserStatus::Pending);
        assert_eq!(created.token.as_deref(), Some("tok_1"));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&create_test_user("dup@example.com", "t1"))
            .await
            .unwrap();

        let result = repo.create(&create_test_user("dup@example.com", "t2")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_lookups_respect_status() {
        let repo = setup_test_repo().await;
        let mut user = repo
            .create(&create_test_user("b@example.com", "verify_me"))
            .await
            .unwrap();

        assert!(repo.get_active_by_email("b@example.com").await.unwrap().is_none());
        assert!(repo.get_by_email("b@example.com").await.unwrap().is_some());
        assert_eq!(
            repo.get_pending_by_token("verify_me").await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert!(repo.get_active_by_token("verify_me").await.unwrap().is_none());

        user.status = UserStatus::Active;
        user.token = None;
        repo.update(&user).await.unwrap();

        assert!(repo.get_pending_by_token("verify_me").await.unwrap().is_none());
        let active = repo
            .get_active_by_email("b@example.com")
            .await
            .unwrap()
            .expect("User should be active");
        assert!(active.token.is_none());
    }

    #[tokio::test]
    async fn test_get_by_email_not_found() {
        let repo = setup_test_repo().await;
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
