//! Static assets and uploaded media
//!
//! `/static/*` is served from files compiled into the binary, `/media/*`
//! from the configured media directory on disk.

use axum::{
    body::Body,
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::RustEmbed;
use tower_http::services::ServeDir;

use crate::config::UploadConfig;
use crate::web::middleware::AppState;

/// Embedded stylesheet and images
#[derive(RustEmbed)]
#[folder = "static/"]
#[include = "*"]
struct StaticAssets;

pub fn router(upload: &UploadConfig) -> Router<AppState> {
    Router::new()
        .route("/static/{*path}", get(serve_static))
        .nest_service("/media", ServeDir::new(&upload.media_path))
}

/// GET /static/{path}
pub async fn serve_static(Path(path): Path<String>) -> Response {
    let asset_path = path.trim_start_matches('/');

    match StaticAssets::get(asset_path) {
        Some(content) => (
            [
                (header::CONTENT_TYPE, get_content_type(asset_path)),
                (header::CACHE_CONTROL, "public, max-age=3600"),
            ],
            Body::from(content.data.into_owned()),
        )
            .into_response(),
        None => not_found(),
    }
}

/// 404 response
fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        "<html><body><h1>404 Not Found</h1></body></html>",
    )
        .into_response()
}

/// Get content type from file extension
fn get_content_type(path: &str) -> &'static str {
    let extension = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match extension.as_str() {
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(get_content_type("rango.css"), "text/css");
        assert_eq!(get_content_type("images/rango.JPG"), "image/jpeg");
        assert_eq!(get_content_type("Rango.CSS"), "text/css");
        assert_eq!(get_content_type("LICENSE"), "application/octet-stream");
        assert_eq!(get_content_type("images/rango.jpg"), "image/jpeg");
    }

    #[tokio::test]
    async fn test_serve_embedded_stylesheet() {
        let response = serve_static(Path("rango.css".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");
    }

    #[tokio::test]
    async fn test_missing_asset() {
        let response = serve_static(Path("nope.js".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
