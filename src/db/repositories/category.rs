//! Category repository
//!
//! - `CategoryRepository` trait defining category data access
//! - `SqlxCategoryRepository` implementing it for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a category, returning it with its assigned ID
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// The `limit` most liked categories, most liked first
    async fn top_by_likes(&self, limit: i64) -> Result<Vec<Category>>;

    async fn count(&self) -> Result<i64>;

    async fn exists_by_name(&self, name: &str) -> Result<bool>;

    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Increment the like counter, returning the new value (`None` if no such category)
    async fn add_like(&self, id: i64) -> Result<Option<i64>>;

    /// Increment the view counter, returning whether the category exists
    async fn add_view(&self, id: i64) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_CATEGORY: &str = "SELECT id, name, slug, views, likes, created_at FROM categories";

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => create_category_mysql(pool, category).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("{} WHERE id = ?", SELECT_CATEGORY);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get category by ID")?;
                row.as_ref().map(row_to_category_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get category by ID")?;
                row.as_ref().map(row_to_category_mysql).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("{} WHERE slug = ?", SELECT_CATEGORY);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get category by slug")?;
                row.as_ref().map(row_to_category_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get category by slug")?;
                row.as_ref().map(row_to_category_mysql).transpose()
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let sql = format!("{} WHERE name = ?", SELECT_CATEGORY);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get category by name")?;
                row.as_ref().map(row_to_category_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get category by name")?;
                row.as_ref().map(row_to_category_mysql).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!("{} ORDER BY name ASC", SELECT_CATEGORY);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list categories")?;
                rows.iter().map(row_to_category_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list categories")?;
                rows.iter().map(row_to_category_mysql).collect()
            }
        }
    }

    async fn top_by_likes(&self, limit: i64) -> Result<Vec<Category>> {
        let sql = format!("{} ORDER BY likes DESC, id ASC LIMIT ?", SELECT_CATEGORY);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list most liked categories")?;
                rows.iter().map(row_to_category_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list most liked categories")?;
                rows.iter().map(row_to_category_mysql).collect()
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM categories";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count categories")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count categories")?
                .get("count"),
        };
        Ok(count)
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        Ok(self.get_by_name(name).await?.is_some())
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }

    async fn add_like(&self, id: i64) -> Result<Option<i64>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => add_like_sqlite(pool, id).await,
            Backend::Mysql(pool) => add_like_mysql(pool, id).await,
        }
    }

    async fn add_view(&self, id: i64) -> Result<bool> {
        let sql = "UPDATE categories SET views = views + 1 WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record category view")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record category view")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, views, likes, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.views)
    .bind(category.likes)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        created_at: now,
        ..category.clone()
    })
}

async fn add_like_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let updated = sqlx::query("UPDATE categories SET likes = likes + 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to like category")?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    let likes: i64 = sqlx::query("SELECT likes FROM categories WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read category likes")?
        .get("likes");

    tx.commit().await.context("Failed to commit like")?;
    Ok(Some(likes))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        views: row.get("views"),
        likes: row.get("likes"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, views, likes, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.views)
    .bind(category.likes)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        created_at: now,
        ..category.clone()
    })
}

async fn add_like_mysql(pool: &MySqlPool, id: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let updated = sqlx::query("UPDATE categories SET likes = likes + 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to like category")?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    let likes: i64 = sqlx::query("SELECT likes FROM categories WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read category likes")?
        .get("likes");

    tx.commit().await.context("Failed to commit like")?;
    Ok(Some(likes))
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        views: row.get("views"),
        likes: row.get("likes"),
        created_at: row.get("created_at"),
    })
}
