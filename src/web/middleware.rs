//! Web middleware
//!
//! Shared application state, the session-cookie authentication layers and
//! the extractors handlers use to find out who is asking.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::config::{Config, UploadConfig};
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxPageRepository, SqlxSessionRepository,
    SqlxUserProfileRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Session, User};
use crate::services::{
    CategoryService, CategoryServiceError, PageService, PageServiceError, UserService,
    UserServiceError,
};
use crate::templates::{simple_error_page, TemplateEngine};

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_URL: &str = "/rango/login/";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub category_service: Arc<CategoryService>,
    pub page_service: Arc<PageService>,
    pub user_service: Arc<UserService>,
    pub templates: Arc<TemplateEngine>,
    pub upload_config: Arc<UploadConfig>,
}

impl AppState {
    /// Wire repositories, services and templates for the given pool
    pub fn new(config: &Config, pool: DynDatabasePool) -> anyhow::Result<Self> {
        let category_service = CategoryService::new(SqlxCategoryRepository::boxed(pool.clone()));
        let page_service = PageService::new(SqlxPageRepository::boxed(pool.clone()));
        let user_service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxUserProfileRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.upload.clone(),
        )
        .with_session_expiration(config.session.expiration_days);
        let templates = TemplateEngine::new(config.templates.path.as_deref())?;

        Ok(Self {
            pool,
            category_service: Arc::new(category_service),
            page_service: Arc::new(page_service),
            user_service: Arc::new(user_service),
            templates: Arc::new(templates),
            upload_config: Arc::new(config.upload.clone()),
        })
    }

    /// Render a page, adding the current user to the context
    pub fn render(&self, template: &str, mut context: TeraContext, user: Option<&User>) -> Html<String> {
        context.insert("user", &user);
        Html(self.templates.render_with_fallback(template, &context))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error returned by page handlers
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Gated page requested without a session; `next` is where to return
    #[error("Login required")]
    LoginRequired { next: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::LoginRequired { next } => Redirect::to(&login_redirect_url(&next)).into_response(),
            WebError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Html(simple_error_page("404 Not Found", &message)),
            )
                .into_response(),
            WebError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Html(simple_error_page("400 Bad Request", &message)),
            )
                .into_response(),
            WebError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(simple_error_page(
                        "500 Internal Server Error",
                        "Something went wrong on our side.",
                    )),
                )
                    .into_response()
            }
        }
    }
}

impl From<CategoryServiceError> for WebError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(id) => WebError::NotFound(format!("Category {} not found", id)),
            CategoryServiceError::Validation(errors) => WebError::BadRequest(errors.to_string()),
            CategoryServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<PageServiceError> for WebError {
    fn from(e: PageServiceError) -> Self {
        match e {
            PageServiceError::NotFound(id) => WebError::NotFound(format!("Page {} not found", id)),
            PageServiceError::Validation(errors) => WebError::BadRequest(errors.to_string()),
            PageServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => WebError::Internal(e),
            UserServiceError::Validation(errors) => WebError::BadRequest(errors.to_string()),
            other => WebError::BadRequest(other.to_string()),
        }
    }
}

/// `/rango/login/?next=<encoded>`
pub fn login_redirect_url(next: &str) -> String {
    format!("{}?next={}", LOGIN_URL, urlencoding::encode(next))
}

// ============================================================================
// Cookies
// ============================================================================

/// Value of the named cookie, if the request carries it
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Extract session token from request
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, SESSION_COOKIE).filter(|token| !token.is_empty())
}

pub fn session_cookie(session: &Session) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        session.max_age_secs()
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

// ============================================================================
// Authentication
// ============================================================================

/// Logged-in user, set by `optional_auth`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The logged-in user, if any
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| WebError::LoginRequired {
                next: full_path(&parts.uri),
            })
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

/// Path plus query string, as sent in `next`
fn full_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Resolve the session cookie to a user for every request.
///
/// Lookup failures are logged and the request continues anonymously.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => tracing::debug!("Ignoring unknown or expired session"),
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Redirect anonymous requests to the login page
pub async fn require_login(request: Request, next: Next) -> Result<Response, WebError> {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return Err(WebError::LoginRequired {
            next: full_path(request.uri()),
        });
    }
    Ok(next.run(request).await)
}

/// Only same-site absolute paths are followed after login
pub fn is_safe_redirect(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}
