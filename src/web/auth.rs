//! Registration, login and logout
//!
//! - GET/POST /rango/register/ - Account and profile registration (multipart)
//! - GET/POST /rango/login/ - Login form
//! - GET /rango/logout/ - End the session (login required)
//! - GET /rango/restricted/ - Members-only page (login required)

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::config::UploadConfig;
use crate::forms::{FormErrors, UserForm, UserProfileForm};
use crate::models::User;
use crate::services::user::picture_too_large;
use crate::services::{ProfilePicture, UserServiceError};
use crate::web::middleware::{
    clear_session_cookie, extract_session_token, is_safe_redirect, session_cookie, AppState,
    AuthenticatedUser, CurrentUser, WebError,
};

pub const INVALID_LOGIN: &str = "Invalid login details supplied.";
pub const ACCOUNT_DISABLED: &str = "Your Rango account is disabled.";

/// Room for the text fields and multipart framing around the picture
const REGISTER_FORM_OVERHEAD: usize = 64 * 1024;

/// Build the public auth router
///
/// The register body limit follows `upload.max_file_size`, so pictures
/// within it reach validation instead of being cut off by the default limit.
pub fn public_router(upload: &UploadConfig) -> Router<AppState> {
    let body_limit = usize::try_from(upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(REGISTER_FORM_OVERHEAD);

    Router::new()
        .route(
            "/rango/register/",
            get(register_form)
                .post(register)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/rango/login/", get(login_form).post(login))
}

/// Routes that need a logged-in user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/rango/logout/", get(logout))
        .route("/rango/restricted/", get(restricted))
}

// ============================================================================
// Registration
// ============================================================================

/// Raw registration submission, before validation
#[derive(Debug, Default)]
struct RegisterSubmission {
    user_form: UserForm,
    profile_form: UserProfileForm,
    picture: Option<ProfilePicture>,
    /// The body went over the size limit while reading
    too_large: bool,
}

/// GET /rango/register/
pub async fn register_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    render_register(&state, &RegisterSubmission::default(), &FormErrors::new(), false, user.as_ref())
}

/// POST /rango/register/
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let submission = read_submission(multipart).await?;

    if submission.too_large {
        tracing::warn!("Registration upload over the size limit");
        let mut errors = FormErrors::new();
        errors.add("picture", picture_too_large(state.upload_config.max_file_size));
        return Ok(render_register(&state, &submission, &errors, false, user.as_ref()));
    }

    let result = state
        .user_service
        .register(
            submission.user_form.clone(),
            submission.profile_form.clone(),
            submission.picture.clone(),
        )
        .await;

    match result {
        Ok((created, _profile)) => {
            tracing::info!("Registered user {}", created.username);
            Ok(render_register(&state, &submission, &FormErrors::new(), true, user.as_ref()))
        }
        Err(UserServiceError::Validation(errors)) => {
            tracing::warn!("Invalid registration: {}", errors);
            Ok(render_register(&state, &submission, &errors, false, user.as_ref()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn read_submission(mut multipart: Multipart) -> Result<RegisterSubmission, WebError> {
    let mut submission = RegisterSubmission::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if is_too_large(&e) => {
                submission.too_large = true;
                break;
            }
            Err(e) => {
                return Err(WebError::BadRequest(format!("Failed to read multipart: {}", e)))
            }
        };
        let name = field.name().unwrap_or("").to_string();

        if name == "picture" {
            let file_name = field.file_name().map(|s| s.to_string());
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = match field.bytes().await {
                Ok(data) => data,
                Err(e) if is_too_large(&e) => {
                    submission.too_large = true;
                    break;
                }
                Err(e) => return Err(WebError::BadRequest(format!("Failed to read file: {}", e))),
            };

            // Browsers send an empty part when no file was chosen.
            if !data.is_empty() {
                submission.picture = Some(ProfilePicture {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = match field.text().await {
            Ok(value) => value,
            Err(e) if is_too_large(&e) => {
                submission.too_large = true;
                break;
            }
            Err(e) => {
                return Err(WebError::BadRequest(format!(
                    "Failed to read field {}: {}",
                    name, e
                )))
            }
        };
        match name.as_str() {
            "username" => submission.user_form.username = value,
            "email" => submission.user_form.email = value,
            "password" => submission.user_form.password = value,
            "website" => submission.profile_form.website = value,
            _ => {}
        }
    }

    Ok(submission)
}

fn is_too_large(e: &MultipartError) -> bool {
    e.status() == StatusCode::PAYLOAD_TOO_LARGE
}

fn render_register(
    state: &AppState,
    submission: &RegisterSubmission,
    errors: &FormErrors,
    registered: bool,
    user: Option<&User>,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("registered", &registered);
    context.insert("errors", errors);
    context.insert("username", &submission.user_form.username);
    context.insert("email", &submission.user_form.email);
    context.insert("website", &submission.profile_form.website);
    state.render("rango/register.html", context, user).into_response()
}

// ============================================================================
// Login / logout
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// GET /rango/login/
pub async fn login_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = query.next.unwrap_or_default();
    render_login(&state, "", &next, None, user.as_ref())
}

/// POST /rango/login/
pub async fn login(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    match state
        .user_service
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(account) => {
            let session = state.user_service.login(&account).await?;
            tracing::info!("User {} logged in", account.username);

            let target = if is_safe_redirect(&form.next) {
                form.next.as_str()
            } else {
                "/rango/"
            };
            Ok((
                AppendHeaders([(header::SET_COOKIE, session_cookie(&session))]),
                Redirect::to(target),
            )
                .into_response())
        }
        Err(UserServiceError::InvalidCredentials) => {
            tracing::warn!("Invalid login details: {}", form.username);
            Ok(render_login(&state, &form.username, &form.next, Some(INVALID_LOGIN), user.as_ref()))
        }
        Err(UserServiceError::AccountDisabled) => {
            tracing::warn!("Login attempt for disabled account: {}", form.username);
            Ok(render_login(&state, &form.username, &form.next, Some(ACCOUNT_DISABLED), user.as_ref()))
        }
        Err(e) => Err(e.into()),
    }
}

fn render_login(
    state: &AppState,
    username: &str,
    next: &str,
    error_message: Option<&str>,
    user: Option<&User>,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("username", username);
    context.insert("next", next);
    context.insert("error_message", &error_message);
    state.render("rango/login.html", context, user).into_response()
}

/// GET /rango/logout/
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    tracing::info!("User {} logged out", user.username);

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Redirect::to("/rango/"),
    )
        .into_response())
}

/// GET /rango/restricted/
pub async fn restricted(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Response {
    state
        .render("rango/restricted.html", TeraContext::new(), Some(&user))
        .into_response()
}
