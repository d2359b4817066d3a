//! Cache infrastructure - backend adapters and their lifecycle

mod factory;
mod guard;
mod in_memory;
mod janitor;
mod postgres;
mod redis;

pub use factory::{
    CacheBackends, CacheFactory, CacheSettings, DocumentStoreType, RedisActivation,
};
pub use in_memory::{InMemoryCacheBackend, InMemoryCacheConfig};
pub use janitor::{spawn_janitor, ExpiredEntryPurger};
pub use postgres::{PostgresCacheBackend, PostgresConfig};
pub use self::redis::{RedisCacheBackend, RedisCacheConfig};
