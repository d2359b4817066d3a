use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::admin;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;

/// Create the full router with application state
///
/// Admin routes are mounted only when an admin token is configured.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check));

    if state.admin_enabled() {
        router = router.nest("/admin", admin::create_admin_router());
    } else {
        info!("No admin token configured; admin routes disabled");
    }

    router
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
