//! User service
//!
//! Account lifecycle and sessions:
//! - registration creates a pending account with a verification token
//! - verification activates it
//! - login (active accounts only) opens a session
//! - password reset goes through a token handed out by email address
//!
//! No mail is sent. Verification and reset links are written to the log.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserStatus};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation;
use crate::services::error::{is_unique_violation, ValidationError};
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Default session lifetime in minutes
const DEFAULT_SESSION_MINUTES: i64 = 20;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials or inactive account)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Unknown or already used token
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ValidationError> for UserServiceError {
    fn from(err: ValidationError) -> Self {
        UserServiceError::ValidationError(err.0)
    }
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_lifetime: Duration,
    public_url: String,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_settings(
            user_repo,
            session_repo,
            DEFAULT_SESSION_MINUTES,
            "http://localhost:8080",
        )
    }

    /// Create a user service with a custom session lifetime and link base
    pub fn with_settings(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_minutes: i64,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_lifetime: Duration::minutes(session_minutes),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn session_lifetime(&self) -> Duration {
        self.session_lifetime
    }

    /// Register a pending account and log its verification link
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let name = validation::required("Name", &input.name)?;
        let email = validation::email(&input.email)?;
        validation::password(&input.password)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(email));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(name, email, password_hash, new_token());
        // A concurrent registration can still win between the check and the insert
        let user = match self.user_repo.create(&user).await {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(user.email.clone()));
            }
            Err(e) => {
                return Err(UserServiceError::InternalError(
                    e.context("Failed to create user"),
                ));
            }
        };

        tracing::info!(
            "Registered {}; verify at {}/api/v1/security/verify/{}",
            user.email,
            self.public_url,
            user.token.as_deref().unwrap_or_default()
        );
        Ok(user)
    }

    /// Activate the pending account holding `token`
    pub async fn verify(&self, token: &str) -> Result<User, UserServiceError> {
        let mut user = self
            .user_repo
            .get_pending_by_token(token)
            .await?
            .ok_or_else(|| UserServiceError::NotFound("Verification token".to_string()))?;

        user.status = UserStatus::Active;
        user.token = None;
        let user = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to activate user")?;

        tracing::info!("Activated user {}", user.id);
        Ok(user)
    }

    /// Check credentials of an active account and open a session
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let user = self
            .user_repo
            .get_active_by_email(input.email.trim())
            .await?
            .ok_or_else(|| UserServiceError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        let session = Session::new(user.id, self.session_lifetime);
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!("User {} logged in", user.id);
        Ok(session)
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User owning a live session; expired sessions are deleted
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(User::is_active))
    }

    /// Hand out a reset token when `email` belongs to an active account.
    ///
    /// Returns the token so callers can tell whether one was issued; the HTTP
    /// layer answers the same way in both cases.
    pub async fn request_reset(&self, email: &str) -> Result<Option<String>, UserServiceError> {
        let mut user = match self.user_repo.get_active_by_email(email.trim()).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let token = new_token();
        user.token = Some(token.clone());
        self.user_repo
            .update(&user)
            .await
            .context("Failed to store reset token")?;

        tracing::info!(
            "Password reset for {}: {}/api/v1/security/reset/{}",
            user.email,
            self.public_url,
            token
        );
        Ok(Some(token))
    }

    /// Active account holding a reset token
    pub async fn reset_target(&self, token: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_active_by_token(token)
            .await?
            .ok_or_else(|| UserServiceError::NotFound("Reset token".to_string()))
    }

    /// Store a new password, consume the token and end every session
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        validation::password(password)?;
        let mut user = self.reset_target(token).await?;

        user.password_hash = hash_password(password)?;
        user.token = None;
        let user = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;

        self.session_repo
            .delete_by_user(user.id)
            .await
            .context("Failed to end sessions")?;

        tracing::info!("Password reset for user {}", user.id);
        Ok(user)
    }

    /// Clean up expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired(Utc::now())
            .await
            .context("Failed to clean up expired sessions")?;
        Ok(count)
    }
}

/// `<uuid>_<unix seconds>`
fn new_token() -> String {
    format!("{}_{}", Uuid::new_v4().simple(), Utc::now().timestamp())
}
