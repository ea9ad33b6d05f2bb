//! Errors shared by the catalog and film services

use crate::pager::PagerError;

/// A rejected input value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error types for catalog and film operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No record for the requested identity
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before reaching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage failure, propagated unchanged
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: &str, id: i64) -> Self {
        ServiceError::NotFound(format!("{} {}", what, id))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.0)
    }
}

impl From<PagerError> for ServiceError {
    fn from(err: PagerError) -> Self {
        match err {
            PagerError::Source(source) => ServiceError::Storage(source),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

/// Whether a storage error is a rejected duplicate on a unique column
pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .filter_map(|e| e.as_database_error())
        .any(|db| db.is_unique_violation() || db.message().contains("UNIQUE constraint failed"))
}
