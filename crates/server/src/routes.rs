//! HTTP routing.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{cache, convert, health, pages};
use crate::state::AppState;

/// Room for multipart boundaries and the other form fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(pages::index))
        .route("/convert", post(convert::convert))
        .route("/health", get(health::health))
        .route("/api/cache/stats", get(cache::stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
