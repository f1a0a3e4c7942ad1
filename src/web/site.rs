//! Index and about pages
//!
//! Both pages count return visits through the `visits` and `last_visit`
//! cookies.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use tera::Context as TeraContext;

use crate::services::visits::{VisitCounter, LAST_VISIT_COOKIE, VISITS_COOKIE};
use crate::web::middleware::{cookie_value, AppState, CurrentUser, WebError};

pub const BOLD_MESSAGE: &str = "Crunchy, creamy, cookie, candy, cupcake!";

/// How many categories and pages the index lists
const TOP_N: i64 = 5;

/// Build the site router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/rango/", get(index))
        .route("/rango/about/", get(about))
}

/// GET /rango/ - Most liked categories and most viewed pages
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let counter = track_visit(&headers);

    let categories = state.category_service.top_by_likes(TOP_N).await?;
    let pages = state.page_service.top_by_views(TOP_N).await?;

    let mut context = TeraContext::new();
    context.insert("boldmessage", BOLD_MESSAGE);
    context.insert("categories", &categories);
    context.insert("pages", &pages);
    context.insert("visits", &counter.visits);

    let html = state.render("rango/index.html", context, user.as_ref());
    Ok(with_visit_cookies(counter, html))
}

/// GET /rango/about/
pub async fn about(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Response {
    let counter = track_visit(&headers);

    let mut context = TeraContext::new();
    context.insert("visits", &counter.visits);

    let html = state.render("rango/about.html", context, user.as_ref());
    with_visit_cookies(counter, html)
}

/// Read the visit cookies and account for this request
fn track_visit(headers: &HeaderMap) -> VisitCounter {
    let now = Utc::now();
    let visits = cookie_value(headers, VISITS_COOKIE);
    let previous = visits.as_deref().map(|v| {
        let last_visit = cookie_value(headers, LAST_VISIT_COOKIE);
        VisitCounter::from_cookies(Some(v), last_visit.as_deref(), now)
    });
    VisitCounter::register_visit(previous, now)
}

fn with_visit_cookies(counter: VisitCounter, body: impl IntoResponse) -> Response {
    let [visits, last_visit] = counter.to_set_cookie_headers();
    (
        AppendHeaders([(header::SET_COOKIE, visits), (header::SET_COOKIE, last_visit)]),
        body,
    )
        .into_response()
}
