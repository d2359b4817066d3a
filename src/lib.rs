//! Prep Cache
//!
//! Request-scoped cache layer for the interview-prep content API:
//! - Deterministic cache keys built from a resource prefix and filters
//! - Read-through lookups over an optional Redis accelerator and a mandatory
//!   document store
//! - Dual writes with relative TTLs and glob-pattern invalidation
//! - Startup warm-up, health reporting and admin endpoints

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::info;

use api::state::AppState;
use infrastructure::cache::{spawn_janitor, CacheFactory, CacheSettings, PostgresConfig};
use infrastructure::services::{CacheService, StorageWarmupSource};

/// Process-wide resources created during startup
///
/// Owns the connection pool and the janitor task so they can be released
/// explicitly at shutdown.
pub struct AppRuntime {
    pub state: AppState,
    janitor: JoinHandle<()>,
    pool: Option<PgPool>,
}

impl AppRuntime {
    /// Stops the janitor and closes the database pool
    pub async fn shutdown(self) {
        self.janitor.abort();
        let _ = self.janitor.await;

        if let Some(pool) = self.pool {
            pool.close().await;
        }

        info!("Cache resources released");
    }
}

/// Create the application state with custom configuration
///
/// Builds the document store (mandatory), attempts Redis once, starts the
/// expiry janitor and warms the hot resources.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppRuntime> {
    let settings = CacheSettings::try_from(&config.cache)?;

    let pool = match &config.database.url {
        Some(url) => {
            info!("Connecting to PostgreSQL...");
            let pool = PostgresConfig::new(url)
                .with_max_connections(config.database.max_connections)
                .with_min_connections(config.database.min_connections)
                .with_connect_timeout(config.database.connect_timeout_secs)
                .connect()
                .await?;
            info!("PostgreSQL connection established");
            Some(pool)
        }
        None => None,
    };

    let backends = CacheFactory::new().create(&settings, pool.clone()).await?;

    let janitor = spawn_janitor(
        backends.purger.clone(),
        Duration::from_secs(config.cache.janitor_interval_secs),
    );

    let cache = Arc::new(CacheService::from_backends(
        &backends,
        config.cache.ttl.clone(),
    ));

    if config.cache.warm_on_startup {
        match &pool {
            Some(pool) => {
                cache.warm_from(&StorageWarmupSource::new(pool.clone())).await;
            }
            None => info!("No database configured; skipping cache warm-up"),
        }
    }

    let mut state = AppState::new(cache);

    if let Some(token) = &config.admin.token {
        state = state.with_admin_token(token.clone());
    }

    Ok(AppRuntime {
        state,
        janitor,
        pool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_default_config_starts_in_memory() {
        let runtime = create_app_state_with_config(&AppConfig::default())
            .await
            .unwrap();

        let cache = runtime.state.cache.clone();
        assert!(!cache.redis_active());
        assert!(!runtime.state.admin_enabled());

        assert!(cache.write("topics", &json!([]), 60).await);
        assert_eq!(cache.read("topics").await, Some(json!([])));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_postgres_store_without_database_url_fails() {
        let mut config = AppConfig::default();
        config.cache.document_store = "postgres".to_string();

        assert!(create_app_state_with_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_token_is_applied() {
        let mut config = AppConfig::default();
        config.admin.token = Some("s3cret".to_string());

        let runtime = create_app_state_with_config(&config).await.unwrap();
        assert!(runtime.state.admin_enabled());

        runtime.shutdown().await;
    }
}
