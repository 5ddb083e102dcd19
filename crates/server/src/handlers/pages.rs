//! Upload page.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
