//! Web layer - HTTP handlers and routing
//!
//! Server-rendered pages under `/rango/`, embedded static assets under
//! `/static/` and uploaded pictures under `/media/`.

pub mod auth;
pub mod categories;
pub mod middleware;
pub mod pages;
pub mod site;
pub mod static_files;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

pub use middleware::{AppState, AuthenticatedUser, CurrentUser, WebError};

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // Protected routes (redirect to the login page without a session)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(categories::protected_router())
        .route_layer(axum_middleware::from_fn(middleware::require_login));

    Router::new()
        .merge(site::router())
        .merge(categories::router())
        .merge(pages::router())
        .merge(auth::public_router(&state.upload_config))
        .merge(protected_routes)
        .merge(static_files::router(&state.upload_config))
        // Session lookup runs before every handler and gated route.
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
