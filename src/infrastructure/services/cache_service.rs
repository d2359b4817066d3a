//! Cache façade used by every read-heavy handler

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::cache::{
    self, BackendHealth, CacheBackend, CacheTtl, KeyPattern, Mutation, TtlPolicy, WarmupSource,
    REDIS_BACKEND,
};
use crate::infrastructure::cache::{CacheBackends, RedisActivation};
use crate::infrastructure::observability::{
    record_cache_lookup, record_cache_write, record_invalidation,
};

/// Read-through, dual-write cache over an optional Redis accelerator and the
/// mandatory document store
///
/// Which backends are active is fixed at construction. Every operation is
/// infallible from the caller's point of view: the worst outcome is a miss.
#[derive(Debug, Clone)]
pub struct CacheService {
    redis: Option<Arc<dyn CacheBackend>>,
    redis_disabled_reason: String,
    document_store: Arc<dyn CacheBackend>,
    ttl_policy: TtlPolicy,
}

impl CacheService {
    /// Creates a façade over the document store alone
    pub fn new(document_store: Arc<dyn CacheBackend>) -> Self {
        Self {
            redis: None,
            redis_disabled_reason: "not configured".to_string(),
            document_store,
            ttl_policy: TtlPolicy::default(),
        }
    }

    /// Creates a façade from the backends activated at startup
    pub fn from_backends(backends: &CacheBackends, ttl_policy: TtlPolicy) -> Self {
        let service = Self::new(backends.document_store.clone()).with_ttl_policy(ttl_policy);

        match &backends.redis {
            RedisActivation::Active(redis) => service.with_redis(redis.clone()),
            RedisActivation::Disabled { reason } => Self {
                redis_disabled_reason: reason.clone(),
                ..service
            },
        }
    }

    /// Activates the Redis accelerator
    pub fn with_redis(mut self, redis: Arc<dyn CacheBackend>) -> Self {
        self.redis = Some(redis);
        self
    }

    pub fn with_ttl_policy(mut self, ttl_policy: TtlPolicy) -> Self {
        self.ttl_policy = ttl_policy;
        self
    }

    pub fn redis_active(&self) -> bool {
        self.redis.is_some()
    }

    /// Seconds configured for a TTL tier
    pub fn ttl_for(&self, tier: CacheTtl) -> u64 {
        self.ttl_policy.seconds(tier)
    }

    /// Deterministic key for a resource prefix and optional filters
    pub fn build_key<I, K, V>(prefix: &str, filters: I) -> String
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: std::fmt::Display,
    {
        cache::build_key(prefix, filters)
    }

    /// Looks the key up in Redis first, then in the document store
    pub async fn read(&self, key: &str) -> Option<Value> {
        if let Some(redis) = &self.redis {
            if let Some(value) = redis.get(key).await {
                record_cache_lookup(redis.name(), true);
                debug!(key = %key, backend = redis.name(), "Cache hit");
                return Some(value);
            }
            record_cache_lookup(redis.name(), false);
        }

        let value = self.document_store.get(key).await;
        record_cache_lookup(self.document_store.name(), value.is_some());

        if value.is_some() {
            debug!(key = %key, backend = self.document_store.name(), "Cache hit");
        } else {
            debug!(key = %key, "Cache miss");
        }

        value
    }

    /// Reads and deserializes; a payload of the wrong shape counts as a miss
    pub async fn read_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.read(key).await?;

        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload has unexpected shape; treating as miss");
                None
            }
        }
    }

    /// Writes to every active backend independently
    ///
    /// Returns whether the document store accepted the write. A Redis failure
    /// neither blocks nor rolls back the document-store write.
    pub async fn write(&self, key: &str, value: &Value, ttl_secs: u64) -> bool {
        if ttl_secs == 0 {
            warn!(key = %key, "Refusing cache write with zero TTL");
            return false;
        }

        let redis_write = async {
            match &self.redis {
                Some(redis) => Some((redis.name(), redis.set(key, value, ttl_secs).await)),
                None => None,
            }
        };

        let (redis_result, stored) = tokio::join!(
            redis_write,
            self.document_store.set(key, value, ttl_secs)
        );

        if let Some((name, redis_stored)) = redis_result {
            record_cache_write(name, redis_stored);
        }
        record_cache_write(self.document_store.name(), stored);

        debug!(key = %key, ttl_secs = ttl_secs, stored = stored, "Cache write");
        stored
    }

    /// Serializes and writes
    pub async fn write_as<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.write(key, &value, ttl_secs).await,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache payload");
                false
            }
        }
    }

    /// Returns the cached value, or runs `loader` and caches its result
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl_secs: u64, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.read_as::<T>(key).await {
            return Ok(cached);
        }

        let loaded = loader().await?;
        self.write_as(key, &loaded, ttl_secs).await;

        Ok(loaded)
    }

    /// Deletes matching keys from every active backend
    ///
    /// Returns the summed count; an invalid pattern removes nothing.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        match KeyPattern::new(pattern) {
            Ok(pattern) => self.invalidate_pattern(&pattern).await,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Ignoring invalid invalidation pattern");
                0
            }
        }
    }

    pub async fn invalidate_pattern(&self, pattern: &KeyPattern) -> usize {
        let redis_delete = async {
            match &self.redis {
                Some(redis) => Some((redis.name(), redis.delete_matching(pattern).await)),
                None => None,
            }
        };

        let (redis_result, stored_removed) =
            tokio::join!(redis_delete, self.document_store.delete_matching(pattern));

        let mut removed = stored_removed;
        record_invalidation(self.document_store.name(), stored_removed);

        if let Some((name, redis_removed)) = redis_result {
            record_invalidation(name, redis_removed);
            removed += redis_removed;
        }

        debug!(pattern = %pattern, removed = removed, "Cache invalidation");
        removed
    }

    /// Invalidates every key a mutation of primary data can leave stale
    pub async fn invalidate_for(&self, mutation: &Mutation) -> usize {
        let mut removed = 0;

        for pattern in mutation.patterns() {
            removed += self.invalidate_pattern(&pattern).await;
        }

        info!(mutation = ?mutation, removed = removed, "Invalidated cache after mutation");
        removed
    }

    /// Removes every entry
    pub async fn flush(&self) -> usize {
        self.invalidate_pattern(&KeyPattern::all()).await
    }

    /// Preloads a hot resource
    pub async fn warm(&self, key: &str, value: &Value, ttl_secs: u64) -> bool {
        let stored = self.write(key, value, ttl_secs).await;
        debug!(key = %key, stored = stored, "Warmed cache entry");
        stored
    }

    /// Preloads everything a warm-up source supplies
    ///
    /// Returns the number of entries stored. A failing source is logged and
    /// leaves the cache cold.
    pub async fn warm_from(&self, source: &dyn WarmupSource) -> usize {
        let items = match source.load().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Cache warm-up source failed; starting cold");
                return 0;
            }
        };

        let mut warmed = 0;

        for item in items {
            let ttl = self.ttl_for(item.ttl);
            if self.warm(&item.key, &item.value, ttl).await {
                warmed += 1;
            }
        }

        info!(warmed = warmed, "Cache warm-up finished");
        warmed
    }

    /// Liveness of every backend; an inactive Redis is reported as disabled
    pub async fn health(&self) -> BTreeMap<String, BackendHealth> {
        let redis_ping = async {
            match &self.redis {
                Some(redis) => redis.ping().await,
                None => BackendHealth::disabled(self.redis_disabled_reason.clone()),
            }
        };

        let (redis, document_store) = tokio::join!(redis_ping, self.document_store.ping());

        let mut health = BTreeMap::new();
        health.insert(REDIS_BACKEND.to_string(), redis);
        health.insert(self.document_store.name().to_string(), document_store);
        health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{MockBackend, MockWarmupSource, WarmupItem};
    use crate::domain::DomainError;
    use crate::infrastructure::cache::InMemoryCacheBackend;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    fn document_store_only() -> CacheService {
        CacheService::new(Arc::new(InMemoryCacheBackend::new()))
    }

    fn with_mock_redis() -> (CacheService, Arc<MockBackend>, Arc<InMemoryCacheBackend>) {
        let redis = Arc::new(MockBackend::new("redis"));
        let store = Arc::new(InMemoryCacheBackend::new());
        let service = CacheService::new(store.clone()).with_redis(redis.clone());
        (service, redis, store)
    }

    #[test]
    fn test_build_key_scenario() {
        let key = CacheService::build_key("questions", [("topic_id", Some("abc")), ("difficulty", None)]);
        assert_eq!(key, "questions_topic_id:abc");
    }

    #[tokio::test]
    async fn test_topics_round_trip() {
        let cache = document_store_only();
        let topics = json!([{"id": "t1", "name": "Arrays"}]);

        assert!(cache.write("topics", &topics, 7200).await);
        assert_eq!(cache.read("topics").await, Some(topics));
    }

    #[tokio::test]
    async fn test_write_then_read_through_both_backends() {
        let (cache, redis, store) = with_mock_redis();

        cache.write("companies", &json!(["acme"]), 3600).await;

        assert!(redis.contains("companies"));
        assert_eq!(store.get("companies").await, Some(json!(["acme"])));
        assert_eq!(cache.read("companies").await, Some(json!(["acme"])));
    }

    #[tokio::test]
    async fn test_redis_hit_skips_document_store() {
        let redis = Arc::new(MockBackend::new("redis").with_entry("topics", json!(["from-redis"])));
        let store = Arc::new(MockBackend::new("document_store"));
        let cache = CacheService::new(store.clone()).with_redis(redis.clone());

        assert_eq!(cache.read("topics").await, Some(json!(["from-redis"])));
        assert_eq!(redis.get_calls(), 1);
        assert_eq!(store.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_redis_miss_falls_back_to_document_store() {
        let redis = Arc::new(MockBackend::new("redis"));
        let store =
            Arc::new(MockBackend::new("document_store").with_entry("topics", json!(["stored"])));
        let cache = CacheService::new(store.clone()).with_redis(redis.clone());

        assert_eq!(cache.read("topics").await, Some(json!(["stored"])));
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_expiry() {
        let cache = document_store_only();

        cache.write("admin_stats", &json!({"users": 10}), 1).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(cache.read("admin_stats").await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_write_is_rejected() {
        let (cache, redis, _) = with_mock_redis();

        assert!(!cache.write("topics", &json!([]), 0).await);
        assert_eq!(redis.set_calls(), 0);
        assert_eq!(cache.read("topics").await, None);
    }

    #[tokio::test]
    async fn test_invalidation_breadth() {
        let cache = document_store_only();

        cache.write("questions_topic_id:T1", &json!(["q1"]), 3600).await;
        cache.write("questions_topic_id:T2", &json!(["q2"]), 3600).await;

        assert_eq!(cache.invalidate("questions*").await, 2);
        assert_eq!(cache.read("questions_topic_id:T1").await, None);
        assert_eq!(cache.read("questions_topic_id:T2").await, None);
    }

    #[tokio::test]
    async fn test_invalidation_precision() {
        let cache = document_store_only();

        cache.write("companies", &json!(["acme"]), 3600).await;
        cache.write("company_questions_company_id:C1", &json!(["q"]), 3600).await;

        assert_eq!(cache.invalidate("companies*").await, 1);
        assert_eq!(
            cache.read("company_questions_company_id:C1").await,
            Some(json!(["q"]))
        );
    }

    #[tokio::test]
    async fn test_invalidate_removes_keys_with_line_breaks() {
        let cache = document_store_only();
        let key = CacheService::build_key("alumni_search", [("q", Some("rust\ngo"))]);

        cache.write(&key, &json!(["a"]), 3600).await;

        assert_eq!(cache.invalidate("alumni_search*").await, 1);
        assert_eq!(cache.read(&key).await, None);
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let cache = document_store_only();
        cache.write("experiences", &json!([]), 3600).await;

        assert_eq!(cache.invalidate("experiences*").await, 1);
        assert_eq!(cache.invalidate("experiences*").await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_sums_backends() {
        let (cache, _, _) = with_mock_redis();
        cache.write("topics", &json!([]), 3600).await;

        assert_eq!(cache.invalidate("topics*").await, 2);
    }

    #[tokio::test]
    async fn test_invalid_pattern_removes_nothing() {
        let cache = document_store_only();
        cache.write("topics", &json!([]), 3600).await;

        assert_eq!(cache.invalidate("").await, 0);
        assert!(cache.read("topics").await.is_some());
    }

    #[tokio::test]
    async fn test_failing_redis_does_not_block_document_store() {
        let (cache, redis, store) = with_mock_redis();
        redis.set_failing(true);

        assert!(cache.write("bookmarks_user_id:u1", &json!(["q1"]), 1800).await);
        assert_eq!(store.get("bookmarks_user_id:u1").await, Some(json!(["q1"])));
        assert_eq!(cache.read("bookmarks_user_id:u1").await, Some(json!(["q1"])));
        assert_eq!(cache.invalidate("bookmarks*").await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_for_question_with_company() {
        let cache = document_store_only();

        for key in [
            "questions_topic_id:T1",
            "company_questions_company_id:C1",
            "bookmarks_user_id:u1",
            "companies",
            "admin_stats",
            "topics",
        ] {
            cache.write(key, &json!(1), 3600).await;
        }

        let removed = cache
            .invalidate_for(&Mutation::Question {
                company_id: Some("C1".to_string()),
            })
            .await;

        assert_eq!(removed, 5);
        assert!(cache.read("topics").await.is_some());
    }

    #[tokio::test]
    async fn test_flush_removes_everything() {
        let cache = document_store_only();
        cache.write("topics", &json!([]), 3600).await;
        cache.write("alumni_search_q:rust", &json!([]), 3600).await;

        assert_eq!(cache.flush().await, 2);
        assert_eq!(cache.read("topics").await, None);
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Topic {
        id: String,
        name: String,
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = document_store_only();
        let topics = vec![Topic {
            id: "t1".to_string(),
            name: "Arrays".to_string(),
        }];

        assert!(cache.write_as("topics", &topics, 7200).await);
        assert_eq!(cache.read_as::<Vec<Topic>>("topics").await, Some(topics));
    }

    #[tokio::test]
    async fn test_read_as_wrong_shape_is_miss() {
        let cache = document_store_only();
        cache.write("topics", &json!("not a list"), 7200).await;

        assert_eq!(cache.read_as::<Vec<Topic>>("topics").await, None);
    }

    #[tokio::test]
    async fn test_get_or_load_calls_loader_once() {
        let cache = document_store_only();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<Vec<String>, DomainError> = cache
                .get_or_load("companies", 3600, || async {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(vec!["acme".to_string()])
                })
                .await;
            assert_eq!(value.unwrap(), vec!["acme".to_string()]);
        }

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_load_propagates_loader_error() {
        let cache = document_store_only();

        let result: Result<Vec<String>, DomainError> = cache
            .get_or_load("companies", 3600, || async {
                Err(DomainError::storage("database down"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(cache.read("companies").await, None);
    }

    #[tokio::test]
    async fn test_warm_from_source() {
        let cache = document_store_only();
        let mut source = MockWarmupSource::new();
        source.expect_load().times(1).returning(|| {
            Ok(vec![
                WarmupItem::new("topics", json!([{"id": "t1"}]), CacheTtl::ReferenceData),
                WarmupItem::new("companies", json!([]), CacheTtl::AggregateList),
            ])
        });

        assert_eq!(cache.warm_from(&source).await, 2);
        assert_eq!(cache.read("topics").await, Some(json!([{"id": "t1"}])));
    }

    #[tokio::test]
    async fn test_warm_from_failing_source_stays_cold() {
        let cache = document_store_only();
        let mut source = MockWarmupSource::new();
        source
            .expect_load()
            .returning(|| Err(DomainError::storage("connection refused")));

        assert_eq!(cache.warm_from(&source).await, 0);
        assert_eq!(cache.read("topics").await, None);
    }

    #[tokio::test]
    async fn test_health_reports_disabled_redis() {
        let cache = document_store_only();
        let health = cache.health().await;

        assert_eq!(health["document_store"], BackendHealth::Healthy);
        assert_eq!(health["redis"], BackendHealth::disabled("not configured"));
    }

    #[tokio::test]
    async fn test_health_reports_failing_redis() {
        let (cache, redis, _) = with_mock_redis();
        redis.set_failing(true);

        let health = cache.health().await;

        assert!(!health["redis"].is_healthy());
        assert!(health["document_store"].is_healthy());
    }

    #[tokio::test]
    async fn test_ttl_for_uses_policy() {
        let cache = document_store_only().with_ttl_policy(TtlPolicy {
            admin_stats_secs: 60,
            ..Default::default()
        });

        assert_eq!(cache.ttl_for(CacheTtl::AdminStats), 60);
        assert_eq!(cache.ttl_for(CacheTtl::ReferenceData), 7200);
    }
}
