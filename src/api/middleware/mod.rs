//! API middleware components

pub mod admin_auth;
pub mod logging;
pub mod metrics;

use axum::{body::Body, extract::MatchedPath, http::Request};

pub use admin_auth::{RequireAdmin, ADMIN_TOKEN_HEADER};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;

/// Route template when matched, for bounded label cardinality
fn matched_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}
