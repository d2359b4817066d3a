//! In-process document store using moka

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};
use serde_json::Value;

use crate::domain::cache::{
    BackendHealth, CacheBackend, CacheEntry, CacheRecord, KeyPattern, DOCUMENT_STORE_BACKEND,
};
use crate::domain::DomainError;

use super::guard::guarded;
use super::janitor::ExpiredEntryPurger;

const BACKEND: &str = DOCUMENT_STORE_BACKEND;

/// Configuration for the in-process document store
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of records
    pub max_capacity: u64,
    /// Timeout applied to every operation
    pub operation_timeout: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            operation_timeout: Duration::from_secs(3),
        }
    }
}

impl InMemoryCacheConfig {
    /// Sets the maximum capacity
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Document-store backend kept in process memory
///
/// Holds the same `CacheRecord` documents as the PostgreSQL table and
/// applies the same lazy expiry: an expired record is deleted when read.
/// Used for development and tests.
#[derive(Debug)]
pub struct InMemoryCacheBackend {
    records: MokaCache<String, CacheRecord>,
    config: InMemoryCacheConfig,
}

impl InMemoryCacheBackend {
    /// Creates a new store with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new store with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let records = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();

        Self { records, config }
    }

    /// Number of stored records, expired ones included
    pub async fn len(&self) -> usize {
        self.records.run_pending_tasks().await;
        self.records.entry_count() as usize
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn try_get(&self, key: &str) -> Result<Option<Value>, DomainError> {
        let Some(record) = self.records.get(key).await else {
            return Ok(None);
        };

        if record.is_expired(Utc::now())? {
            self.remove_if_unchanged(key, &record.expires_at).await;
            return Ok(None);
        }

        Ok(Some(record.into_entry()?.payload))
    }

    /// Removes the record only while it is still the version that expires at
    /// `expires_at`; a concurrent rewrite survives
    async fn remove_if_unchanged(&self, key: &str, expires_at: &str) -> bool {
        let result = self
            .records
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().expires_at == expires_at => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        matches!(result, CompResult::Removed(_))
    }

    async fn try_set(&self, key: &str, payload: &Value, ttl_secs: u64) -> Result<bool, DomainError> {
        let record = CacheEntry::new(key, payload.clone(), ttl_secs, Utc::now()).to_record()?;
        self.records.insert(key.to_string(), record).await;
        Ok(true)
    }

    async fn try_delete_matching(&self, pattern: &KeyPattern) -> Result<usize, DomainError> {
        let regex = pattern.compile()?;

        self.records.run_pending_tasks().await;

        let keys_to_delete: Vec<String> = self
            .records
            .iter()
            .filter(|(key, _)| regex.is_match(key.as_str()))
            .map(|(key, _)| key.to_string())
            .collect();

        for key in &keys_to_delete {
            self.records.invalidate(key).await;
        }

        Ok(keys_to_delete.len())
    }
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
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
        guarded(
            BACKEND,
            "delete_matching",
            pattern.as_str(),
            self.config.operation_timeout,
            0,
            self.try_delete_matching(pattern),
        )
        .await
    }

    async fn ping(&self) -> BackendHealth {
        BackendHealth::Healthy
    }
}

#[async_trait]
impl ExpiredEntryPurger for InMemoryCacheBackend {
    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let now = Utc::now();

        self.records.run_pending_tasks().await;

        let expired: Vec<(String, String)> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_expired(now).unwrap_or(true))
            .map(|(key, record)| (key.to_string(), record.expires_at.clone()))
            .collect();

        let mut purged = 0;

        for (key, expires_at) in &expired {
            if self.remove_if_unchanged(key, expires_at).await {
                purged += 1;
            }
        }

        Ok(purged)
    }
}
