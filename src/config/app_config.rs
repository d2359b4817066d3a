use serde::Deserialize;

use crate::domain::cache::TtlPolicy;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application database, shared by the document store and the warm-up source
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Redis is optional; without a URL the service runs on the document store alone
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// `postgres` or `in_memory`
    #[serde(default = "default_document_store")]
    pub document_store: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
    #[serde(default = "default_true")]
    pub warm_on_startup: bool,
    #[serde(default)]
    pub ttl: TtlPolicy,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdminConfig {
    /// Admin routes are only mounted when a token is configured
    pub token: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_document_store() -> String {
    "in_memory".to_string()
}

fn default_table() -> String {
    "cache".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    3000
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_scan_batch_size() -> usize {
    100
}

fn default_janitor_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: None,
            document_store: default_document_store(),
            table: default_table(),
            operation_timeout_ms: default_operation_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            scan_batch_size: default_scan_batch_size(),
            janitor_interval_secs: default_janitor_interval_secs(),
            warm_on_startup: true,
            ttl: TtlPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8001);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.database.url.is_none());
        assert_eq!(config.cache.document_store, "in_memory");
        assert_eq!(config.cache.table, "cache");
        assert_eq!(config.cache.ttl.user_data_secs, 1800);
        assert!(config.cache.warm_on_startup);
        assert!(config.admin.token.is_none());
        assert!(config.observability.metrics.enabled);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let raw = r#"{
            "cache": { "redis_url": "redis://cache:6379", "ttl": { "admin_stats_secs": 60 } },
            "logging": { "format": "json" }
        }"#;

        let config: AppConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.cache.ttl.admin_stats_secs, 60);
        assert_eq!(config.cache.ttl.reference_data_secs, 7200);
        assert_eq!(config.cache.scan_batch_size, 100);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
