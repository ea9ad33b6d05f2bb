//! Category model

use serde::{Deserialize, Serialize};

/// Product category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
}

impl Category {
    /// Create a new, not yet stored category
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0, // Will be set by the database
            name: name.into(),
        }
    }
}
