//! Admin authentication
//!
//! Accepts the configured admin token from either:
//! - `X-Admin-Token: <token>`
//! - `Authorization: Bearer <token>`

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Extractor that requires the admin token
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(ApiError::unauthorized("Admin access is not configured"));
        };

        let Some(presented) = presented_token(&parts.headers) else {
            return Err(ApiError::unauthorized(
                "Admin token required. Provide X-Admin-Token or Authorization: Bearer",
            ));
        };

        if !tokens_match(presented, expected) {
            warn!(path = %parts.uri.path(), "Rejected invalid admin token");
            return Err(ApiError::unauthorized("Invalid admin token"));
        }

        debug!(path = %parts.uri.path(), "Admin access granted");
        Ok(RequireAdmin)
    }
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(token.trim());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Comparison time does not depend on where the first mismatch is
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());

    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
