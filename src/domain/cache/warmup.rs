//! Startup warm-up contract

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::DomainError;

use super::ttl::CacheTtl;

/// A hot resource to preload at startup
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupItem {
    pub key: String,
    pub value: Value,
    pub ttl: CacheTtl,
}

impl WarmupItem {
    pub fn new(key: impl Into<String>, value: Value, ttl: CacheTtl) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
        }
    }
}

/// Supplies the values of known hot resources from the primary store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarmupSource: Send + Sync {
    async fn load(&self) -> Result<Vec<WarmupItem>, DomainError>;
}
