//! Geocode cache inspection.

use axum::Json;
use axum::extract::State;
use kmz2csv_core::GeocacheStats;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/cache/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<GeocacheStats>, ApiError> {
    let stats = state.cache.geocache_stats().await?;
    Ok(Json(stats))
}
