//! Application configuration

mod app_config;

pub use app_config::{
    AdminConfig, AppConfig, CacheConfig, DatabaseConfig, LogFormat, LoggingConfig, ServerConfig,
};
