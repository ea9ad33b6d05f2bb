//! Movie and movie image models

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::slug::generate_slug;

/// Movie in the film library, filed under one thematic.
///
/// Deleting a movie deletes its images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movie {
    /// Unique identifier
    pub id: i64,
    pub name: String,
    /// Derived from `name` on every write
    pub slug: String,
    pub description: String,
    /// Time of the last write
    pub date: Option<DateTime<Utc>>,
    pub thematic_id: i64,
    /// Name of the parent thematic, present on records read from storage
    pub thematic_name: Option<String>,
}

impl Movie {
    /// Create a new movie, deriving its slug and stamping the current time
    pub fn new(name: impl Into<String>, description: impl Into<String>, thematic_id: i64) -> Self {
        let name = name.into();
        Self {
            id: 0, // Will be set by the database
            slug: generate_slug(&name),
            name,
            description: description.into(),
            date: Some(Utc::now().trunc_subsecs(0)),
            thematic_id,
            thematic_name: None,
        }
    }
}

/// Image attached to a movie; `name` is the stored file name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieImage {
    pub id: i64,
    pub name: Option<String>,
    pub movie_id: i64,
}

impl MovieImage {
    pub fn new(name: impl Into<String>, movie_id: i64) -> Self {
        Self {
            id: 0,
            name: Some(name.into()),
            movie_id,
        }
    }
}
