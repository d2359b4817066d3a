//! Backend construction at startup

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::domain::cache::CacheBackend;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCacheBackend, InMemoryCacheConfig};
use super::janitor::ExpiredEntryPurger;
use super::postgres::PostgresCacheBackend;
use super::redis::{RedisCacheBackend, RedisCacheConfig};

/// Supported document-store variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentStoreType {
    /// In-process store using moka
    #[default]
    InMemory,
    /// Table in the application PostgreSQL database
    Postgres,
}

impl std::fmt::Display for DocumentStoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStoreType::InMemory => write!(f, "in_memory"),
            DocumentStoreType::Postgres => write!(f, "postgres"),
        }
    }
}

impl std::str::FromStr for DocumentStoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(DocumentStoreType::InMemory),
            "postgres" | "postgresql" => Ok(DocumentStoreType::Postgres),
            _ => Err(DomainError::configuration(format!(
                "Unknown document store: {}. Valid types: in_memory, postgres",
                s
            ))),
        }
    }
}

/// Settings consumed by the factory
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub document_store: DocumentStoreType,
    pub table: String,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    pub operation_timeout: Duration,
    pub connect_timeout: Duration,
    pub scan_batch_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            document_store: DocumentStoreType::InMemory,
            table: "cache".to_string(),
            redis_url: None,
            key_prefix: None,
            operation_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(3),
            scan_batch_size: 100,
        }
    }
}

impl TryFrom<&CacheConfig> for CacheSettings {
    type Error = DomainError;

    fn try_from(config: &CacheConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            document_store: config.document_store.parse()?,
            table: config.table.clone(),
            redis_url: config.redis_url.clone().filter(|url| !url.trim().is_empty()),
            key_prefix: config.key_prefix.clone(),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            scan_batch_size: config.scan_batch_size,
        })
    }
}

/// The backends activated for this process
///
/// Decided once at startup and never changed afterwards.
#[derive(Clone)]
pub struct CacheBackends {
    pub document_store: Arc<dyn CacheBackend>,
    pub purger: Arc<dyn ExpiredEntryPurger>,
    pub redis: RedisActivation,
}

/// Outcome of the single Redis activation attempt
#[derive(Clone)]
pub enum RedisActivation {
    Active(Arc<dyn CacheBackend>),
    Disabled { reason: String },
}

impl std::fmt::Debug for RedisActivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedisActivation::Active(backend) => f.debug_tuple("Active").field(backend).finish(),
            RedisActivation::Disabled { reason } => {
                f.debug_struct("Disabled").field("reason", reason).finish()
            }
        }
    }
}

/// Factory for the cache backends
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Builds the mandatory document store and attempts Redis once
    pub async fn create(
        &self,
        settings: &CacheSettings,
        pool: Option<PgPool>,
    ) -> Result<CacheBackends, DomainError> {
        let (document_store, purger) = self.create_document_store(settings, pool).await?;
        let redis = self.activate_redis(settings).await;

        Ok(CacheBackends {
            document_store,
            purger,
            redis,
        })
    }

    /// Builds the document-store variant; failure here is fatal
    pub async fn create_document_store(
        &self,
        settings: &CacheSettings,
        pool: Option<PgPool>,
    ) -> Result<(Arc<dyn CacheBackend>, Arc<dyn ExpiredEntryPurger>), DomainError> {
        match settings.document_store {
            DocumentStoreType::InMemory => {
                let store = Arc::new(InMemoryCacheBackend::with_config(InMemoryCacheConfig {
                    operation_timeout: settings.operation_timeout,
                    ..Default::default()
                }));

                info!("Using in-memory document store");
                let document_store: Arc<dyn CacheBackend> = store.clone();
                let purger: Arc<dyn ExpiredEntryPurger> = store;
                Ok((document_store, purger))
            }
            DocumentStoreType::Postgres => {
                let pool = pool.ok_or_else(|| {
                    DomainError::configuration(
                        "database.url is required for the postgres document store",
                    )
                })?;

                let store = Arc::new(PostgresCacheBackend::new(
                    pool,
                    settings.table.clone(),
                    settings.operation_timeout,
                )?);
                store.ensure_table().await?;

                info!(table = %settings.table, "Using PostgreSQL document store");
                let document_store: Arc<dyn CacheBackend> = store.clone();
                let purger: Arc<dyn ExpiredEntryPurger> = store;
                Ok((document_store, purger))
            }
        }
    }

    /// Attempts to connect to Redis; any failure disables it for the process
    pub async fn activate_redis(&self, settings: &CacheSettings) -> RedisActivation {
        let Some(url) = settings.redis_url.clone() else {
            info!("Redis not configured; serving from the document store only");
            return RedisActivation::Disabled {
                reason: "not configured".to_string(),
            };
        };

        let mut config = RedisCacheConfig::new(url)
            .with_connection_timeout(settings.connect_timeout)
            .with_operation_timeout(settings.operation_timeout)
            .with_scan_batch_size(settings.scan_batch_size);

        if let Some(prefix) = &settings.key_prefix {
            config = config.with_key_prefix(prefix.clone());
        }

        match RedisCacheBackend::connect(config).await {
            Ok(backend) => {
                info!("Redis cache activated");
                RedisActivation::Active(Arc::new(backend))
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable; disabled until restart");
                RedisActivation::Disabled {
                    reason: e.to_string(),
                }
            }
        }
    }
}
