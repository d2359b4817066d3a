//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("prep_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router serving `path`
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record a cache read against one backend
pub fn record_cache_lookup(backend: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("cache_lookups_total", "backend" => backend, "result" => result).increment(1);
}

/// Record a cache write against one backend
pub fn record_cache_write(backend: &'static str, stored: bool) {
    let status = if stored { "stored" } else { "failed" };
    counter!("cache_writes_total", "backend" => backend, "status" => status).increment(1);
}

/// Record keys removed by a pattern invalidation
pub fn record_invalidation(backend: &'static str, removed: usize) {
    counter!("cache_invalidated_keys_total", "backend" => backend).increment(removed as u64);
}

/// Record a backend failure that was absorbed
pub fn record_backend_error(backend: &'static str, operation: &'static str) {
    counter!("cache_backend_errors_total", "backend" => backend, "operation" => operation)
        .increment(1);
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Collapse high-cardinality path segments (cache keys, ids) into placeholders
fn sanitize_path(path: &str) -> String {
    let mut sanitized = Vec::new();
    let mut after_entries = false;

    for segment in path.split('/') {
        let replaced = if after_entries && !segment.is_empty() {
            "{key}"
        } else if uuid::Uuid::parse_str(segment).is_ok()
            || (!segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
        {
            "{id}"
        } else {
            segment
        };

        after_entries = segment == "entries";
        sanitized.push(replaced);
    }

    let path = sanitized.join("/");

    if path.len() > 50 {
        path.chars().take(50).collect()
    } else {
        path
    }
}
