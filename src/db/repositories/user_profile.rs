//! User profile repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::UserProfile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// User profile repository trait
#[async_trait]
pub trait UserProfileRepository: Send + Sync {
    async fn create(&self, profile: &UserProfile) -> Result<UserProfile>;

    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserProfile>>;
}

/// SQLx-based user profile repository implementation
pub struct SqlxUserProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxUserProfileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserProfileRepository for SqlxUserProfileRepository {
    async fn create(&self, profile: &UserProfile) -> Result<UserProfile> {
        let sql = "INSERT INTO user_profiles (user_id, website, picture) VALUES (?, ?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(profile.user_id)
                .bind(&profile.website)
                .bind(&profile.picture)
                .execute(pool)
                .await
                .context("Failed to create user profile")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(profile.user_id)
                .bind(&profile.website)
                .bind(&profile.picture)
                .execute(pool)
                .await
                .context("Failed to create user profile")?
                .last_insert_id() as i64,
        };

        Ok(UserProfile {
            id,
            ..profile.clone()
        })
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let sql = "SELECT id, user_id, website, picture FROM user_profiles WHERE user_id = ?";
        let profile = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user profile")?
                .map(|row| UserProfile {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    website: row.get("website"),
                    picture: row.get("picture"),
                }),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user profile")?
                .map(|row| UserProfile {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    website: row.get("website"),
                    picture: row.get("picture"),
                }),
        };
        Ok(profile)
    }
}
