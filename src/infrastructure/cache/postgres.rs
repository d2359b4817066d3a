//! PostgreSQL document-store backend

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::domain::cache::{
    format_timestamp, BackendHealth, CacheBackend, CacheEntry, CacheRecord, KeyPattern,
    DOCUMENT_STORE_BACKEND,
};
use crate::domain::DomainError;

use super::guard::{guarded, within};
use super::janitor::ExpiredEntryPurger;

const BACKEND: &str = DOCUMENT_STORE_BACKEND;

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/prep".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Opens the process-wide connection pool
    pub async fn connect(&self) -> Result<PgPool, DomainError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .connect(&self.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))
    }
}

/// Cache collection stored as a table in the application database
///
/// One row per key: `key` (primary key), `data` (serialized payload),
/// `expires_at` and `created_at` (RFC 3339 text). Expiry is checked lazily on
/// read; the janitor removes the rest.
pub struct PostgresCacheBackend {
    pool: PgPool,
    table_name: String,
    operation_timeout: Duration,
}

impl Debug for PostgresCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresCacheBackend")
            .field("table_name", &self.table_name)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl PostgresCacheBackend {
    /// Creates a backend over an existing pool
    pub fn new(
        pool: PgPool,
        table_name: impl Into<String>,
        operation_timeout: Duration,
    ) -> Result<Self, DomainError> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;

        Ok(Self {
            pool,
            table_name,
            operation_timeout,
        })
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensures the cache table and its expiry index exist
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            self.table_name
        );

        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_expires_at_idx ON {table} (expires_at)",
            table = self.table_name
        );

        for query in [create_table, create_index] {
            sqlx::query(&query)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to create cache table: {}", e)))?;
        }

        Ok(())
    }

    fn record_from_row(row: &PgRow) -> Result<CacheRecord, DomainError> {
        let column = |name: &str| -> Result<String, DomainError> {
            row.try_get::<String, _>(name)
                .map_err(|e| DomainError::storage(format!("Failed to read column '{}': {}", name, e)))
        };

        Ok(CacheRecord {
            key: column("key")?,
            data: column("data")?,
            expires_at: column("expires_at")?,
            created_at: column("created_at")?,
        })
    }

    async fn try_get(&self, key: &str) -> Result<Option<Value>, DomainError> {
        let query = format!(
            "SELECT key, data, expires_at, created_at FROM {} WHERE key = $1",
            self.table_name
        );

        let row = sqlx::query(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get cache entry: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let record = Self::record_from_row(&row)?;

        if record.is_expired(Utc::now())? {
            // Only remove the version we read; a concurrent rewrite survives
            let delete = format!(
                "DELETE FROM {} WHERE key = $1 AND expires_at = $2",
                self.table_name
            );

            sqlx::query(&delete)
                .bind(key)
                .bind(&record.expires_at)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to delete expired entry: {}", e)))?;

            return Ok(None);
        }

        Ok(Some(record.into_entry()?.payload))
    }

    async fn try_set(&self, key: &str, payload: &Value, ttl_secs: u64) -> Result<bool, DomainError> {
        let record = CacheEntry::new(key, payload.clone(), ttl_secs, Utc::now()).to_record()?;

        let query = format!(
            r#"
            INSERT INTO {} (key, data, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO UPDATE
            SET data = EXCLUDED.data,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .bind(&record.key)
            .bind(&record.data)
            .bind(&record.expires_at)
            .bind(&record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to upsert cache entry: {}", e)))?;

        Ok(true)
    }

    async fn try_delete_matching(&self, pattern: &KeyPattern) -> Result<usize, DomainError> {
        let query = format!("DELETE FROM {} WHERE key ~ $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(pattern.to_regex())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete cache entries: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn try_ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| DomainError::storage(format!("PostgreSQL ping failed: {}", e)))
    }
}

/// Table names are interpolated into SQL, so only identifiers are accepted
fn validate_table_name(name: &str) -> Result<(), DomainError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "Invalid cache table name: '{}'",
            name
        )))
    }
}

#[async_trait]
impl CacheBackend for PostgresCacheBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Option<Value> {
        guarded(BACKEND, "get", key, self.operation_timeout, None, self.try_get(key)).await
    }

    async fn set(&self, key: &str, payload: &Value, ttl_secs: u64) -> bool {
        guarded(
            BACKEND,
            "set",
            key,
            self.operation_timeout,
            false,
            self.try_set(key, payload, ttl_secs),
        )
        .await
    }

    async fn delete_matching(&self, pattern: &KeyPattern) -> usize {
        guarded(
            BACKEND,
            "delete_matching",
            pattern.as_str(),
            self.operation_timeout,
            0,
            self.try_delete_matching(pattern),
        )
        .await
    }

    async fn ping(&self) -> BackendHealth {
        match within(BACKEND, "ping", self.operation_timeout, self.try_ping()).await {
            Ok(()) => BackendHealth::Healthy,
            Err(e) => BackendHealth::unhealthy(e.to_string()),
        }
    }
}

#[async_trait]
impl ExpiredEntryPurger for PostgresCacheBackend {
    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let query = format!("DELETE FROM {} WHERE expires_at < $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(format_timestamp(Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to purge expired entries: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }
}
