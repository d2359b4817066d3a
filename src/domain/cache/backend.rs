//! Backend adapter contract

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::pattern::KeyPattern;

/// Name of the optional key-value accelerator
pub const REDIS_BACKEND: &str = "redis";

/// Name of the mandatory document-store variant, whichever store realises it
pub const DOCUMENT_STORE_BACKEND: &str = "document_store";

/// Liveness classification of a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BackendHealth {
    Healthy,
    Unhealthy { reason: String },
    /// Never activated for this process
    Disabled { reason: String },
}

impl BackendHealth {
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self::Unhealthy {
            reason: reason.into(),
        }
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::Disabled {
            reason: reason.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Uniform contract over a physical cache store
///
/// Implementations absorb every transport, timeout and serialization failure
/// at this boundary: reads degrade to a miss, writes to `false`, deletions
/// to a zero count. Nothing here returns an error.
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// Stable backend name used in logs, metrics and health output
    fn name(&self) -> &'static str;

    /// Returns the stored payload if present and not expired
    async fn get(&self, key: &str) -> Option<Value>;

    /// Upserts the payload with an expiry `ttl_secs` from now
    async fn set(&self, key: &str, payload: &Value, ttl_secs: u64) -> bool;

    /// Deletes every key matching the pattern, returning the count removed
    async fn delete_matching(&self, pattern: &KeyPattern) -> usize;

    /// Liveness check
    async fn ping(&self) -> BackendHealth;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scriptable backend for testing
    ///
    /// Ignores TTLs; `set_failing(true)` makes every call behave as a
    /// swallowed transport failure.
    #[derive(Debug)]
    pub struct MockBackend {
        name: &'static str,
        entries: Mutex<HashMap<String, Value>>,
        failing: AtomicBool,
        gets: AtomicUsize,
        sets: AtomicUsize,
    }

    impl MockBackend {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                entries: Mutex::new(HashMap::new()),
                failing: AtomicBool::new(false),
                gets: AtomicUsize::new(0),
                sets: AtomicUsize::new(0),
            }
        }

        pub fn with_entry(self, key: &str, value: Value) -> Self {
            self.entries.lock().unwrap().insert(key.to_string(), value);
            self
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn contains(&self, key: &str) -> bool {
            self.entries.lock().unwrap().contains_key(key)
        }

        pub fn get_calls(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }

        pub fn set_calls(&self) -> usize {
            self.sets.load(Ordering::SeqCst)
        }

        fn is_failing(&self) -> bool {
            self.failing.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CacheBackend for MockBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn get(&self, key: &str) -> Option<Value> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.is_failing() {
                return None;
            }
            self.entries.lock().unwrap().get(key).cloned()
        }

        async fn set(&self, key: &str, payload: &Value, _ttl_secs: u64) -> bool {
            self.sets.fetch_add(1, Ordering::SeqCst);
            if self.is_failing() {
                return false;
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), payload.clone());
            true
        }

        async fn delete_matching(&self, pattern: &KeyPattern) -> usize {
            if self.is_failing() {
                return 0;
            }
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|key, _| !pattern.matches(key));
            before - entries.len()
        }

        async fn ping(&self) -> BackendHealth {
            if self.is_failing() {
                BackendHealth::unhealthy("Connection refused")
            } else {
                BackendHealth::Healthy
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[tokio::test]
        async fn test_mock_backend_set_get() {
            let backend = MockBackend::new("mock");

            assert!(backend.set("key1", &json!("value1"), 60).await);
            assert_eq!(backend.get("key1").await, Some(json!("value1")));
        }

        #[tokio::test]
        async fn test_mock_backend_failing() {
            let backend = MockBackend::new("mock").with_entry("key1", json!(1));
            backend.set_failing(true);

            assert_eq!(backend.get("key1").await, None);
            assert!(!backend.set("key2", &json!(2), 60).await);
            assert!(!backend.ping().await.is_healthy());
        }

        #[tokio::test]
        async fn test_mock_backend_delete_matching() {
            let backend = MockBackend::new("mock")
                .with_entry("user_id:1", json!(1))
                .with_entry("user_id:2", json!(2))
                .with_entry("other", json!(3));

            let pattern = KeyPattern::new("user_id:*").unwrap();
            assert_eq!(backend.delete_matching(&pattern).await, 2);
            assert!(backend.contains("other"));
        }
    }
}
