//! Cache domain - keys, patterns, entries and the backend contract

mod backend;
mod entry;
mod invalidation;
mod key;
mod pattern;
mod ttl;
mod warmup;

pub use backend::{BackendHealth, CacheBackend, DOCUMENT_STORE_BACKEND, REDIS_BACKEND};
pub use entry::{
    clamp_ttl, format_timestamp, parse_timestamp, CacheEntry, CacheRecord, MAX_TTL_SECS,
};
pub use invalidation::Mutation;
pub use key::{build_key, namespace, CacheKeyParams, SEGMENT_SEPARATOR, VALUE_SEPARATOR};
pub use pattern::KeyPattern;
pub use ttl::{CacheTtl, TtlPolicy};
pub use warmup::{WarmupItem, WarmupSource};

#[cfg(test)]
pub use backend::mock::MockBackend;
#[cfg(test)]
pub use warmup::MockWarmupSource;
