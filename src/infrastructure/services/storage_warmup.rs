//! Warm-up source reading the application tables

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::domain::cache::{namespace, CacheTtl, WarmupItem, WarmupSource};
use crate::domain::DomainError;

/// One application table preloaded in full under a single key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupCollection {
    pub table: &'static str,
    pub key: &'static str,
    pub ttl: CacheTtl,
}

/// Hot resources requested on nearly every page load
pub const DEFAULT_COLLECTIONS: &[WarmupCollection] = &[
    WarmupCollection {
        table: "topics",
        key: namespace::TOPICS,
        ttl: CacheTtl::ReferenceData,
    },
    WarmupCollection {
        table: "companies",
        key: namespace::COMPANIES,
        ttl: CacheTtl::AggregateList,
    },
];

/// Loads full collections from the JSON document tables of the primary store
#[derive(Debug, Clone)]
pub struct StorageWarmupSource {
    pool: PgPool,
    collections: Vec<WarmupCollection>,
}

impl StorageWarmupSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            collections: DEFAULT_COLLECTIONS.to_vec(),
        }
    }

    pub fn with_collections(mut self, collections: Vec<WarmupCollection>) -> Self {
        self.collections = collections;
        self
    }

    async fn load_table(&self, table: &str) -> Result<Value, DomainError> {
        let query = format!("SELECT data FROM {} ORDER BY created_at", table);

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list {}: {}", table, e)))?;

        let mut documents = Vec::with_capacity(rows.len());

        for row in rows {
            let data: Value = row.try_get("data").map_err(|e| {
                DomainError::storage(format!("Failed to read {} document: {}", table, e))
            })?;
            documents.push(data);
        }

        Ok(Value::Array(documents))
    }
}

#[async_trait]
impl WarmupSource for StorageWarmupSource {
    async fn load(&self) -> Result<Vec<WarmupItem>, DomainError> {
        let mut items = Vec::with_capacity(self.collections.len());

        for collection in &self.collections {
            match self.load_table(collection.table).await {
                Ok(value) => items.push(WarmupItem::new(collection.key, value, collection.ttl)),
                Err(e) => warn!(table = collection.table, error = %e, "Skipping warm-up collection"),
            }
        }

        Ok(items)
    }
}
