//! Page pages
//!
//! - GET/POST /rango/category/{slug}/add_page/ - Add a page to a category
//! - GET /rango/goto/?page_id=N - Count a click-through and follow it

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::forms::{FormErrors, PageForm};
use crate::models::{Category, User};
use crate::services::PageServiceError;
use crate::web::middleware::{AppState, CurrentUser, WebError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/rango/category/{slug}/add_page/",
            get(add_page_form).post(add_page),
        )
        .route("/rango/goto/", get(goto))
}

/// GET /rango/category/{slug}/add_page/
pub async fn add_page_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, WebError> {
    let Some(category) = state.category_service.get_by_slug(&slug).await? else {
        return Ok(Redirect::to("/rango/").into_response());
    };
    Ok(render_form(&state, &category, &PageForm::default(), &FormErrors::new(), user.as_ref()))
}

/// POST /rango/category/{slug}/add_page/
pub async fn add_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Form(form): Form<PageForm>,
) -> Result<Response, WebError> {
    let Some(category) = state.category_service.get_by_slug(&slug).await? else {
        return Ok(Redirect::to("/rango/").into_response());
    };

    match state.page_service.create(&category, form.clone()).await {
        Ok(page) => {
            tracing::info!("Added page {} to category {}", page.title, category.slug);
            Ok(Redirect::to(&format!("/rango/category/{}/", category.slug)).into_response())
        }
        Err(PageServiceError::Validation(errors)) => {
            tracing::warn!("Invalid page form: {}", errors);
            Ok(render_form(&state, &category, &form, &errors, user.as_ref()))
        }
        Err(e) => Err(e.into()),
    }
}

fn render_form(
    state: &AppState,
    category: &Category,
    form: &PageForm,
    errors: &FormErrors,
    user: Option<&User>,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("category", category);
    context.insert("form", form);
    context.insert("errors", errors);
    state.render("rango/add_page.html", context, user).into_response()
}

#[derive(Debug, Deserialize)]
pub struct GotoQuery {
    pub page_id: Option<String>,
}

/// GET /rango/goto/?page_id=N
///
/// Missing, malformed and unknown ids go back to the index.
pub async fn goto(
    State(state): State<AppState>,
    Query(query): Query<GotoQuery>,
) -> Result<Redirect, WebError> {
    let Some(page_id) = query.page_id.and_then(|id| id.trim().parse::<i64>().ok()) else {
        return Ok(Redirect::to("/rango/"));
    };

    match state.page_service.record_visit(page_id).await {
        Ok(page) => Ok(Redirect::to(&page.url)),
        Err(PageServiceError::NotFound(_)) => Ok(Redirect::to("/rango/")),
        Err(e) => Err(e.into()),
    }
}
