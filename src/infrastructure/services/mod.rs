//! Infrastructure services

mod cache_service;
mod storage_warmup;

pub use cache_service::CacheService;
pub use storage_warmup::{StorageWarmupSource, WarmupCollection, DEFAULT_COLLECTIONS};
