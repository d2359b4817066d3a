//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::CacheService;

/// State shared by every handler
///
/// Built once during startup; handlers only read it.
#[derive(Clone, Debug)]
pub struct AppState {
    pub cache: Arc<CacheService>,
    /// Token guarding the admin routes; `None` leaves them unmounted
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self {
            cache,
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.admin_token = (!token.is_empty()).then(|| Arc::from(token));
        self
    }

    pub fn admin_enabled(&self) -> bool {
        self.admin_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::InMemoryCacheBackend;

    fn cache() -> Arc<CacheService> {
        Arc::new(CacheService::new(Arc::new(InMemoryCacheBackend::new())))
    }

    #[test]
    fn test_admin_disabled_by_default() {
        assert!(!AppState::new(cache()).admin_enabled());
    }

    #[test]
    fn test_empty_token_keeps_admin_disabled() {
        let state = AppState::new(cache()).with_admin_token("");
        assert!(!state.admin_enabled());

        let state = AppState::new(cache()).with_admin_token("s3cret");
        assert_eq!(state.admin_token.as_deref(), Some("s3cret"));
    }
}
