//! Cache administration endpoints

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::cache::KeyPattern;

/// Request to invalidate keys by glob
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

/// Invalidation result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidateResponse {
    pub pattern: String,
    pub removed: usize,
}

/// Flush result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlushResponse {
    pub removed: usize,
}

/// POST /admin/cache/invalidate
pub async fn invalidate_cache(
    RequireAdmin: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let pattern = KeyPattern::new(request.pattern)?;
    let removed = state.cache.invalidate_pattern(&pattern).await;

    info!(pattern = %pattern, removed = removed, "Admin cache invalidation");

    Ok(Json(InvalidateResponse {
        pattern: pattern.as_str().to_string(),
        removed,
    }))
}

/// GET /admin/cache/entries/{key}
pub async fn get_cache_entry(
    RequireAdmin: RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .cache
        .read(&key)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No cache entry for key '{}'", key)))
}

/// DELETE /admin/cache
pub async fn flush_cache(
    RequireAdmin: RequireAdmin,
    State(state): State<AppState>,
) -> Json<FlushResponse> {
    let removed = state.cache.flush().await;

    info!(removed = removed, "Admin cache flush");

    Json(FlushResponse { removed })
}
