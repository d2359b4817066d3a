//! Domain layer - Cache types and contracts

pub mod cache;
pub mod error;

pub use cache::{
    build_key, BackendHealth, CacheBackend, CacheEntry, CacheKeyParams, CacheRecord, CacheTtl,
    KeyPattern, Mutation, TtlPolicy, WarmupItem, WarmupSource,
};
pub use error::DomainError;
