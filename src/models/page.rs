//! Page model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An external web page filed under exactly one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub url: String,
    /// Number of times the page was opened through the goto redirect
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl Page {
    /// Create an unsaved page with zero views.
    pub fn new(category_id: i64, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: 0,
            category_id,
            title: title.into(),
            url: url.into(),
            views: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_views(mut self, views: i64) -> Self {
        self.views = views;
        self
    }
}
