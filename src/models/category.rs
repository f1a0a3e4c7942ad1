//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A category groups pages under a shared topic and is addressed by its slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    /// Display name, unique across categories
    pub name: String,
    /// URL-friendly form of `name`
    pub slug: String,
    pub views: i64,
    /// Popularity counter used to rank categories on the index page
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create an unsaved category with zeroed counters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            slug: slug.into(),
            views: 0,
            likes: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_counters(mut self, views: i64, likes: i64) -> Self {
        self.views = views;
        self.likes = likes;
        self
    }
}
