//! Thematic model

use serde::{Deserialize, Serialize};

use crate::slug::generate_slug;

/// Theme grouping movies. Deleting a thematic deletes its movies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thematic {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Thematic {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: 0, // Will be set by the database
            slug: generate_slug(&name),
            name,
        }
    }
}
