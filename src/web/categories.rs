//! Category pages
//!
//! - GET/POST /rango/category/{slug}/ - Category with its pages
//! - GET/POST /rango/add_category/ - Add-category form
//! - GET /rango/like_category/?category_id=N - Like a category (login required)

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::forms::{CategoryForm, FormErrors};
use crate::services::CategoryServiceError;
use crate::web::middleware::{AppState, AuthenticatedUser, CurrentUser, WebError};

/// Build the public category router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rango/category/{slug}/", get(show_category).post(show_category))
        .route("/rango/add_category/", get(add_category_form).post(add_category))
}

/// Routes that need a logged-in user
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/rango/like_category/", get(like_category))
}

/// GET /rango/category/{slug}/
///
/// Unknown slugs render the page with `category` and `pages` set to null.
pub async fn show_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();

    match state.category_service.get_by_slug(&slug).await? {
        Some(category) => {
            let pages = state.page_service.list_for_category(category.id).await?;
            state.category_service.record_view(category.id).await?;
            context.insert("category", &category);
            context.insert("pages", &pages);
        }
        None => {
            context.insert("category", &None::<()>);
            context.insert("pages", &None::<()>);
        }
    }

    Ok(state
        .render("rango/category.html", context, user.as_ref())
        .into_response())
}

/// GET /rango/add_category/
pub async fn add_category_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    render_form(&state, &CategoryForm::default(), &FormErrors::new(), user.as_ref())
}

/// POST /rango/add_category/
pub async fn add_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CategoryForm>,
) -> Result<Response, WebError> {
    match state.category_service.create(form.clone()).await {
        Ok(category) => {
            tracing::info!("Created category {} ({})", category.name, category.slug);
            Ok(Redirect::to("/rango/").into_response())
        }
        Err(CategoryServiceError::Validation(errors)) => {
            tracing::warn!("Invalid category form: {}", errors);
            Ok(render_form(&state, &form, &errors, user.as_ref()))
        }
        Err(e) => Err(e.into()),
    }
}

fn render_form(
    state: &AppState,
    form: &CategoryForm,
    errors: &FormErrors,
    user: Option<&crate::models::User>,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    state
        .render("rango/add_category.html", context, user)
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LikeQuery {
    pub category_id: Option<String>,
}

/// GET /rango/like_category/?category_id=N
///
/// Responds with the new like count as plain text, or `-1` when the id is
/// missing, malformed or unknown.
pub async fn like_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<LikeQuery>,
) -> Result<String, WebError> {
    let Some(id) = query.category_id.and_then(|id| id.trim().parse::<i64>().ok()) else {
        return Ok("-1".to_string());
    };

    match state.category_service.like(id).await {
        Ok(likes) => {
            tracing::debug!("{} liked category {}", user.username, id);
            Ok(likes.to_string())
        }
        Err(CategoryServiceError::NotFound(_)) => Ok("-1".to_string()),
        Err(e) => Err(e.into()),
    }
}
