//! Category service
//!
//! Creation with name and slug uniqueness, lookup by slug, the most-liked
//! listing for the index page, and likes.

use crate::db::is_unique_violation;
use crate::db::repositories::CategoryRepository;
use crate::forms::{CategoryForm, FormErrors};
use crate::models::Category;
use crate::services::slug::slugify;
use anyhow::Context;
use std::sync::Arc;

pub const DUPLICATE_NAME: &str = "Category with this Name already exists.";
pub const EMPTY_SLUG: &str = "Enter a name containing letters or numbers.";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// The submitted form did not validate
    #[error("Invalid category: {0}")]
    Validation(FormErrors),

    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Validate the form and insert a new category with zeroed counters.
    ///
    /// A slug collision between different names (e.g. "Web Dev" and
    /// "web-dev") is reported against the name field as well.
    pub async fn create(&self, mut form: CategoryForm) -> Result<Category, CategoryServiceError> {
        form.validate().map_err(CategoryServiceError::Validation)?;

        let mut errors = FormErrors::new();
        if self
            .repo
            .exists_by_name(&form.name)
            .await
            .context("Failed to check name uniqueness")?
        {
            errors.add("name", DUPLICATE_NAME);
            return Err(CategoryServiceError::Validation(errors));
        }

        let slug = slugify(&form.name);
        if slug.is_empty() {
            errors.add("name", EMPTY_SLUG);
            return Err(CategoryServiceError::Validation(errors));
        }
        if self
            .repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            errors.add("name", DUPLICATE_NAME);
            return Err(CategoryServiceError::Validation(errors));
        }

        // A concurrent insert of the same name can still win the race.
        match self.repo.create(&Category::new(form.name, slug)).await {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => {
                errors.add("name", DUPLICATE_NAME);
                Err(CategoryServiceError::Validation(errors))
            }
            Err(e) => Err(e.context("Failed to create category").into()),
        }
    }

    /// Look up a category by slug; unknown slugs yield `None`
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, CategoryServiceError> {
        let category = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?;
        Ok(category)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        let category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?;
        Ok(category)
    }

    /// The `limit` most liked categories
    pub async fn top_by_likes(&self, limit: i64) -> Result<Vec<Category>, CategoryServiceError> {
        let categories = self
            .repo
            .top_by_likes(limit)
            .await
            .context("Failed to list most liked categories")?;
        Ok(categories)
    }

    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        let categories = self.repo.list().await.context("Failed to list categories")?;
        Ok(categories)
    }

    pub async fn count(&self) -> Result<i64, CategoryServiceError> {
        let count = self.repo.count().await.context("Failed to count categories")?;
        Ok(count)
    }

    /// Add a like, returning the new total
    pub async fn like(&self, id: i64) -> Result<i64, CategoryServiceError> {
        self.repo
            .add_like(id)
            .await
            .context("Failed to like category")?
            .ok_or(CategoryServiceError::NotFound(id))
    }

    /// Count a visit to the category page
    pub async fn record_view(&self, id: i64) -> Result<(), CategoryServiceError> {
        self.repo
            .add_view(id)
            .await
            .context("Failed to record category view")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        CategoryService::new(SqlxCategoryRepository::boxed(pool))
    }

    /// Repository whose uniqueness checks always miss, as when another
    /// request inserts the same category between check and insert
    struct StaleChecks(SqlxCategoryRepository);

    #[async_trait::async_trait]
    impl CategoryRepository for StaleChecks {
        async fn create(&self, category: &Category) -> anyhow::Result<Category> {
            self.0.create(category).await
        }
        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Category>> {
            self.0.get_by_id(id).await
        }
        async fn get_by_slug(&self, slug: &str) -> anyhow::Result<Option<Category>> {
            self.0.get_by_slug(slug).await
        }
        async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Category>> {
            self.0.get_by_name(name).await
        }
        async fn list(&self) -> anyhow::Result<Vec<Category>> {
            self.0.list().await
        }
        async fn top_by_likes(&self, limit: i64) -> anyhow::Result<Vec<Category>> {
            self.0.top_by_likes(limit).await
        }
        async fn count(&self) -> anyhow::Result<i64> {
            self.0.count().await
        }
        async fn exists_by_name(&self, _name: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn exists_by_slug(&self, _slug: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn add_like(&self, id: i64) -> anyhow::Result<Option<i64>> {
            self.0.add_like(id).await
        }
        async fn add_view(&self, id: i64) -> anyhow::Result<bool> {
            self.0.add_view(id).await
        }
    }

    fn validation_errors(err: CategoryServiceError) -> FormErrors {
        match err {
            CategoryServiceError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_after_check_is_a_form_error() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let service = CategoryService::new(Arc::new(StaleChecks(SqlxCategoryRepository::new(
            pool.clone(),
        ))));

        service.create(CategoryForm::new("Django")).await.unwrap();
        let err = service.create(CategoryForm::new("Django")).await.unwrap_err();

        assert_eq!(
            validation_errors(err).get("name"),
            Some(&[DUPLICATE_NAME.to_string()][..])
        );
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_category() {
        let service = setup_test_service().await;

        let created = service
            .create(CategoryForm::new("  Other Frameworks "))
            .await
            .expect("Failed to create category");

        assert_eq!(created.name, "Other Frameworks");
        assert_eq!(created.slug, "other-frameworks");
        assert_eq!(created.views, 0);
        assert_eq!(created.likes, 0);
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_form_error() {
        let service = setup_test_service().await;
        service.create(CategoryForm::new("Python")).await.unwrap();

        let errors = validation_errors(service.create(CategoryForm::new("Python")).await.unwrap_err());
        assert_eq!(errors.get("name"), Some(&[DUPLICATE_NAME.to_string()][..]));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_slug_collision_reported_on_name() {
        let service = setup_test_service().await;
        service.create(CategoryForm::new("Web Dev")).await.unwrap();

        let errors = validation_errors(service.create(CategoryForm::new("web-dev")).await.unwrap_err());
        assert!(errors.has("name"));
    }

    #[tokio::test]
    async fn test_unsluggable_name_rejected() {
        let service = setup_test_service().await;
        let errors = validation_errors(service.create(CategoryForm::new("!!!")).await.unwrap_err());
        assert_eq!(errors.get("name"), Some(&[EMPTY_SLUG.to_string()][..]));
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let service = setup_test_service().await;
        let errors = validation_errors(service.create(CategoryForm::new("")).await.unwrap_err());
        assert!(errors.has("name"));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_by_slug_unknown_is_none() {
        let service = setup_test_service().await;
        assert!(service.get_by_slug("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_like() {
        let service = setup_test_service().await;
        let category = service.create(CategoryForm::new("Django")).await.unwrap();

        assert_eq!(service.like(category.id).await.unwrap(), 1);
        assert_eq!(service.like(category.id).await.unwrap(), 2);
        assert!(matches!(
            service.like(category.id + 10).await,
            Err(CategoryServiceError::NotFound(_))
        ));

        let top = service.top_by_likes(5).await.unwrap();
        assert_eq!(top[0].likes, 2);
    }
}
