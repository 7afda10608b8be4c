//! The browser UI: a single static page driving the JSON API.

use axum::response::Html;

/// The page served at `/`.
pub const INDEX_HTML: &str = include_str!("../assets/index.html");

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
