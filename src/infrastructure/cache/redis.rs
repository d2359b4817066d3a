//! Redis backend adapter

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use tracing::debug;

use crate::domain::cache::{clamp_ttl, BackendHealth, CacheBackend, KeyPattern, REDIS_BACKEND};
use crate::domain::DomainError;

use super::guard::{absorb, guarded, within};

const BACKEND: &str = REDIS_BACKEND;

/// Configuration for the Redis backend
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Timeout for establishing the connection
    pub connection_timeout: Duration,
    /// Timeout applied to every individual command
    pub operation_timeout: Duration,
    /// `COUNT` hint for each SCAN batch
    pub scan_batch_size: usize,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(3),
            operation_timeout: Duration::from_secs(3),
            scan_batch_size: 100,
        }
    }
}

impl RedisCacheConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the per-command timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets the SCAN batch size
    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size.max(1);
        self
    }
}

/// Redis-backed cache store
///
/// Expiry is native (`SET EX`); pattern deletion walks the keyspace with an
/// incremental SCAN cursor and deletes each batch as it arrives.
#[derive(Clone)]
pub struct RedisCacheBackend {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCacheBackend {
    /// Connects and verifies the server answers PING
    pub async fn connect(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = within(BACKEND, "connect", config.connection_timeout, async {
            ConnectionManager::new(client)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))
        })
        .await?;

        let backend = Self { connection, config };
        backend.try_ping().await?;

        Ok(backend)
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn try_get(&self, key: &str) -> Result<Option<Value>, DomainError> {
        let mut conn = self.connection.clone();

        let raw: Option<String> = conn
            .get(self.prefix_key(key))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get key '{}': {}", key, e)))?;

        match raw {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn try_set(&self, key: &str, payload: &Value, ttl_secs: u64) -> Result<bool, DomainError> {
        let data = serde_json::to_string(payload)?;
        let mut conn = self.connection.clone();

        let _: () = conn
            .set_ex(self.prefix_key(key), data, expiry_secs(ttl_secs))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(true)
    }

    async fn scan_batch(&self, cursor: u64, glob: &str) -> Result<(u64, Vec<String>), DomainError> {
        let mut conn = self.connection.clone();
        let batch = self.config.scan_batch_size;

        within(BACKEND, "scan", self.config.operation_timeout, async move {
            redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(batch)
                .query_async(&mut conn)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to scan keys: {}", e)))
        })
        .await
    }

    async fn delete_keys(&self, keys: Vec<String>) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        within(BACKEND, "del", self.config.operation_timeout, async move {
            let deleted: usize = conn
                .del(&keys)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to delete keys: {}", e)))?;
            Ok(deleted)
        })
        .await
    }

    async fn try_ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        within(BACKEND, "ping", self.config.operation_timeout, async move {
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(|_| ())
                .map_err(|e| DomainError::cache(format!("PING failed: {}", e)))
        })
        .await
    }
}

/// SCAN MATCH glob for a pattern under the optional key prefix
fn match_glob(key_prefix: Option<&str>, pattern: &KeyPattern) -> String {
    let glob = pattern.to_redis_glob();

    match key_prefix {
        Some(prefix) => format!("{}:{}", escape_glob_literal(prefix), glob),
        None => glob,
    }
}

/// `SET EX` rejects zero and out-of-range expiries
fn expiry_secs(ttl_secs: u64) -> u64 {
    clamp_ttl(ttl_secs).max(1)
}

/// Escapes every Redis glob special so the text matches only itself
fn escape_glob_literal(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());

    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Option<Value> {
        guarded(
            BACKEND,
            "get",
            key,
            self.config.operation_timeout,
            None,
            self.try_get(key),
        )
        .await
    }

    async fn set(&self, key: &str, payload: &Value, ttl_secs: u64) -> bool {
        guarded(
            BACKEND,
            "set",
            key,
            self.config.operation_timeout,
            false,
            self.try_set(key, payload, ttl_secs),
        )
        .await
    }

    async fn delete_matching(&self, pattern: &KeyPattern) -> usize {
        let glob = match_glob(self.config.key_prefix.as_deref(), pattern);
        let mut cursor = 0u64;
        let mut total_deleted = 0usize;

        loop {
            let (next_cursor, keys) = match self.scan_batch(cursor, &glob).await {
                Ok(batch) => batch,
                Err(e) => {
                    absorb(BACKEND, "delete_matching", pattern.as_str(), &e);
                    break;
                }
            };

            if !keys.is_empty() {
                match self.delete_keys(keys).await {
                    Ok(deleted) => total_deleted += deleted,
                    Err(e) => {
                        absorb(BACKEND, "delete_matching", pattern.as_str(), &e);
                        break;
                    }
                }
            }

            cursor = next_cursor;

            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = total_deleted, "Redis pattern delete finished");
        total_deleted
    }

    async fn ping(&self) -> BackendHealth {
        match self.try_ping().await {
            Ok(()) => BackendHealth::Healthy,
            Err(e) => BackendHealth::unhealthy(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MAX_TTL_SECS;
    use serde_json::json;

    // These tests require a running Redis instance

    fn get_test_config() -> RedisCacheConfig {
        RedisCacheConfig::new("redis://127.0.0.1:6379").with_key_prefix("prep-cache-test")
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails_fast() {
        let config = RedisCacheConfig::new("redis://127.0.0.1:1")
            .with_connection_timeout(Duration::from_millis(500));

        let result = RedisCacheBackend::connect(config).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_escape_glob_literal() {
        assert_eq!(escape_glob_literal("app*1"), r"app\*1");
        assert_eq!(escape_glob_literal("plain"), "plain");
    }

    #[test]
    fn test_match_glob_escapes_prefix_and_pattern() {
        let pattern = KeyPattern::new("q?*").unwrap();

        assert_eq!(match_glob(Some("app*"), &pattern), r"app\*:q\?*");
        assert_eq!(match_glob(None, &pattern), r"q\?*");
    }

    #[test]
    fn test_expiry_secs_is_clamped() {
        assert_eq!(expiry_secs(0), 1);
        assert_eq!(expiry_secs(3600), 3600);
        assert_eq!(expiry_secs(u64::MAX), MAX_TTL_SECS);
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(Client::open("not a url").is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = RedisCacheConfig::new("redis://localhost")
            .with_key_prefix("myapp")
            .with_scan_batch_size(0)
            .with_operation_timeout(Duration::from_secs(1));

        assert_eq!(config.key_prefix, Some("myapp".to_string()));
        assert_eq!(config.scan_batch_size, 1);
        assert_eq!(config.operation_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let cache = RedisCacheBackend::connect(get_test_config()).await.unwrap();
        let value = json!([{"id": "t1", "name": "Arrays"}]);

        assert!(cache.set("topics", &value, 60).await);
        assert_eq!(cache.get("topics").await, Some(value));

        cache.delete_matching(&KeyPattern::new("topics").unwrap()).await;
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_delete_matching_prefix() {
        let cache = RedisCacheBackend::connect(get_test_config()).await.unwrap();

        cache.set("questions_topic_id:T1", &json!(1), 60).await;
        cache.set("questions_topic_id:T2", &json!(2), 60).await;
        cache.set("company_questions_company_id:C1", &json!(3), 60).await;

        let deleted = cache
            .delete_matching(&KeyPattern::new("questions*").unwrap())
            .await;
        assert_eq!(deleted, 2);
        assert!(cache.get("company_questions_company_id:C1").await.is_some());

        cache.delete_matching(&KeyPattern::all()).await;
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_expiry() {
        let cache = RedisCacheBackend::connect(get_test_config()).await.unwrap();

        cache.set("short", &json!("v"), 1).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.get("short").await, None);
    }
}
