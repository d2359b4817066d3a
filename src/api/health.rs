//! Health check endpoints for Kubernetes probes

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;
use crate::domain::cache::{BackendHealth, DOCUMENT_STORE_BACKEND};

use super::state::AppState;

/// Health response with per-backend status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub backends: BTreeMap<String, BackendHealth>,
}

/// Health check status
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// The document store decides between up and down; any other unhealthy
    /// backend only degrades. Disabled backends are ignored.
    pub fn classify(backends: &BTreeMap<String, BackendHealth>) -> Self {
        let mut status = HealthStatus::Healthy;

        for (name, health) in backends {
            if let BackendHealth::Unhealthy { .. } = health {
                if name == DOCUMENT_STORE_BACKEND {
                    return HealthStatus::Unhealthy;
                }
                status = HealthStatus::Degraded;
            }
        }

        status
    }
}

/// Reports every cache backend
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let backends = state.cache.health().await;
    let status = HealthStatus::classify(&backends);

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        backends,
    };

    let status_code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check - simple check to verify the service is running
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}
