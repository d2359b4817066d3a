//! Admin API endpoints for operating the cache

pub mod cache;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/cache", delete(cache::flush_cache))
        .route("/cache/invalidate", post(cache::invalidate_cache))
        .route("/cache/entries/{key}", get(cache::get_cache_entry))
}
