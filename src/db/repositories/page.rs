//! Page repository
//!
//! Pages are always read either per category or as the site-wide
//! most-viewed list, both ordered by views.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Page;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Page repository trait
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn create(&self, page: &Page) -> Result<Page>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>>;

    /// Pages of one category, most viewed first
    async fn list_by_category(&self, category_id: i64) -> Result<Vec<Page>>;

    /// Whether the category already holds a page with this title
    async fn exists_in_category(&self, category_id: i64, title: &str) -> Result<bool>;

    /// The `limit` most viewed pages across all categories
    async fn top_by_views(&self, limit: i64) -> Result<Vec<Page>>;

    async fn count(&self) -> Result<i64>;

    /// Increment the view counter and return the updated page
    async fn add_view(&self, id: i64) -> Result<Option<Page>>;
}

/// SQLx-based page repository implementation
pub struct SqlxPageRepository {
    pool: DynDatabasePool,
}

impl SqlxPageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_PAGE: &str = "SELECT id, category_id, title, url, views, created_at FROM pages";

#[async_trait]
impl PageRepository for SqlxPageRepository {
    async fn create(&self, page: &Page) -> Result<Page> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_page_sqlite(pool, page).await,
            Backend::Mysql(pool) => create_page_mysql(pool, page).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_page_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_page_by_id_mysql(pool, id).await,
        }
    }

    async fn list_by_category(&self, category_id: i64) -> Result<Vec<Page>> {
        let sql = format!(
            "{} WHERE category_id = ? ORDER BY views DESC, id ASC",
            SELECT_PAGE
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(category_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list pages by category")?;
                rows.iter().map(row_to_page_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(category_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list pages by category")?;
                rows.iter().map(row_to_page_mysql).collect()
            }
        }
    }

    async fn exists_in_category(&self, category_id: i64, title: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM pages WHERE category_id = ? AND title = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(category_id)
                .bind(title)
                .fetch_one(pool)
                .await
                .context("Failed to check page existence")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(category_id)
                .bind(title)
                .fetch_one(pool)
                .await
                .context("Failed to check page existence")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn top_by_views(&self, limit: i64) -> Result<Vec<Page>> {
        let sql = format!("{} ORDER BY views DESC, id ASC LIMIT ?", SELECT_PAGE);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list most viewed pages")?;
                rows.iter().map(row_to_page_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list most viewed pages")?;
                rows.iter().map(row_to_page_mysql).collect()
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM pages";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count pages")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count pages")?
                .get("count"),
        };
        Ok(count)
    }

    async fn add_view(&self, id: i64) -> Result<Option<Page>> {
        let sql = "UPDATE pages SET views = views + 1 WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record page view")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record page view")?
                .rows_affected(),
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_page_sqlite(pool: &SqlitePool, page: &Page) -> Result<Page> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO pages (category_id, title, url, views, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(page.category_id)
    .bind(&page.title)
    .bind(&page.url)
    .bind(page.views)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create page")?;

    Ok(Page {
        id: result.last_insert_rowid(),
        created_at: now,
        ..page.clone()
    })
}

async fn get_page_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Page>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PAGE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by ID")?;

    row.as_ref().map(row_to_page_sqlite).transpose()
}

fn row_to_page_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Page> {
    Ok(Page {
        id: row.get("id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        url: row.get("url"),
        views: row.get("views"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_page_mysql(pool: &MySqlPool, page: &Page) -> Result<Page> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO pages (category_id, title, url, views, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(page.category_id)
    .bind(&page.title)
    .bind(&page.url)
    .bind(page.views)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create page")?;

    Ok(Page {
        id: result.last_insert_id() as i64,
        created_at: now,
        ..page.clone()
    })
}

async fn get_page_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Page>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PAGE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by ID")?;

    row.as_ref().map(row_to_page_mysql).transpose()
}

fn row_to_page_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Page> {
    Ok(Page {
        id: row.get("id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        url: row.get("url"),
        views: row.get("views"),
        created_at: row.get("created_at"),
    })
}
