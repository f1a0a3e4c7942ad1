//! Page service

use crate::db::repositories::PageRepository;
use crate::forms::{FormErrors, PageForm};
use crate::models::{Category, Page};
use anyhow::Context;
use std::sync::Arc;

/// Error types for page service operations
#[derive(Debug, thiserror::Error)]
pub enum PageServiceError {
    #[error("Invalid page: {0}")]
    Validation(FormErrors),

    #[error("Page not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PageService {
    repo: Arc<dyn PageRepository>,
}

impl PageService {
    pub fn new(repo: Arc<dyn PageRepository>) -> Self {
        Self { repo }
    }

    /// Clean and validate the form, then add the page to `category`
    pub async fn create(&self, category: &Category, mut form: PageForm) -> Result<Page, PageServiceError> {
        form.validate().map_err(PageServiceError::Validation)?;

        let page = Page::new(category.id, form.title, form.url);
        let created = self.repo.create(&page).await.context("Failed to create page")?;
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Page>, PageServiceError> {
        let page = self.repo.get_by_id(id).await.context("Failed to get page")?;
        Ok(page)
    }

    /// Pages of a category, most viewed first
    pub async fn list_for_category(&self, category_id: i64) -> Result<Vec<Page>, PageServiceError> {
        let pages = self
            .repo
            .list_by_category(category_id)
            .await
            .context("Failed to list pages")?;
        Ok(pages)
    }

    pub async fn top_by_views(&self, limit: i64) -> Result<Vec<Page>, PageServiceError> {
        let pages = self
            .repo
            .top_by_views(limit)
            .await
            .context("Failed to list most viewed pages")?;
        Ok(pages)
    }

    pub async fn count(&self) -> Result<i64, PageServiceError> {
        let count = self.repo.count().await.context("Failed to count pages")?;
        Ok(count)
    }

    /// Count a click-through and return the page to redirect to
    pub async fn record_visit(&self, page_id: i64) -> Result<Page, PageServiceError> {
        self.repo
            .add_view(page_id)
            .await
            .context("Failed to record page visit")?
            .ok_or(PageServiceError::NotFound(page_id))
    }
}
