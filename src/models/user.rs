//! User and profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account record used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Username (unique)
    pub username: String,
    pub email: Option<String>,
    /// Password hash (argon2, PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive accounts cannot log in
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user.
    ///
    /// The password must already be hashed, see `services::password::hash_password`.
    pub fn new(username: impl Into<String>, email: Option<String>, password_hash: String) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email,
            password_hash,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }
}

/// Profile extension of a user, one-to-one with `User`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub website: Option<String>,
    /// Media-relative path of the uploaded picture, e.g. `profile_images/<uuid>.png`
    pub picture: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: i64, website: Option<String>, picture: Option<String>) -> Self {
        Self {
            id: 0,
            user_id,
            website,
            picture,
        }
    }
}
