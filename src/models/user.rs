//! User model
//!
//! Accounts start out `Pending` and become `Active` once the verification
//! token sent at registration is presented. Only active users can log in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique), used to log in
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: UserStatus,
    /// Pending verification or password-reset token
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl User {
    /// Create a pending user holding a verification token.
    ///
    /// The password must already be hashed.
    pub fn new(name: String, email: String, password_hash: String, token: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            password_hash,
            status: UserStatus::Pending,
            token: Some(token),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Account state, stored as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Registered but not verified yet
    #[default]
    Pending,
    Active,
}

impl UserStatus {
    /// Stored representation
    pub fn as_i64(self) -> i64 {
        match self {
            UserStatus::Pending => 0,
            UserStatus::Active => 1,
        }
    }

    /// Parse the stored representation; unknown values are treated as pending
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => UserStatus::Active,
            _ => UserStatus::Pending,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Pending => write!(f, "pending"),
            UserStatus::Active => write!(f, "active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_is_pending_with_token() {
        let user = User::new(
            "Ana".to_string(),
            "ana@example.com".to_string(),
            "hash".to_string(),
            "tok".to_string(),
        );
        assert_eq!(user.status, UserStatus::Pending);
        assert!(!user.is_active());
        assert_eq!(user.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_status_storage_roundtrip() {
        for status in [UserStatus::Pending, UserStatus::Active] {
            assert_eq!(UserStatus::from_i64(status.as_i64()), status);
        }
        assert_eq!(UserStatus::from_i64(7), UserStatus::Pending);
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let user = User::new(
            "Ana".to_string(),
            "ana@example.com".to_string(),
            "secret-hash".to_string(),
            "secret-token".to_string(),
        );
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("secret-token"));
        assert!(json.contains("\"status\":\"pending\""));
    }
}
