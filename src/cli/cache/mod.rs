//! One-shot cache commands run against the configured backends

use tracing::warn;

use crate::api::health::HealthStatus;
use crate::config::{AppConfig, CacheConfig};
use crate::domain::cache::KeyPattern;
use crate::infrastructure::cache::{CacheSettings, DocumentStoreType};
use crate::AppRuntime;

/// Delete every key matching `pattern` and print the count
pub async fn invalidate(pattern: String) -> anyhow::Result<()> {
    let pattern = KeyPattern::new(pattern)?;
    let config = super::bootstrap()?;
    ensure_shared_backends(&config.cache)?;

    let runtime = start(config).await?;

    let removed = runtime.state.cache.invalidate_pattern(&pattern).await;
    println!("Removed {} keys matching '{}'", removed, pattern);

    runtime.shutdown().await;
    Ok(())
}

/// Print backend health as JSON; fails when the document store is down
pub async fn health() -> anyhow::Result<()> {
    let runtime = start(super::bootstrap()?).await?;

    let backends = runtime.state.cache.health().await;
    let status = HealthStatus::classify(&backends);
    println!("{}", serde_json::to_string_pretty(&backends)?);

    runtime.shutdown().await;

    if status == HealthStatus::Unhealthy {
        anyhow::bail!("Document store is unhealthy");
    }

    Ok(())
}

/// An in-memory document store lives inside the server process, so this
/// process can only reach a shared Redis
fn ensure_shared_backends(config: &CacheConfig) -> anyhow::Result<()> {
    let settings = CacheSettings::try_from(config)?;

    if settings.document_store != DocumentStoreType::InMemory {
        return Ok(());
    }

    if settings.redis_url.is_none() {
        anyhow::bail!(
            "Nothing to invalidate: the in_memory document store belongs to the server process \
             and no Redis is configured"
        );
    }

    warn!("in_memory document store is not shared; only Redis keys will be invalidated");
    Ok(())
}

/// One-shot commands never warm the cache
async fn start(mut config: AppConfig) -> anyhow::Result<AppRuntime> {
    config.cache.warm_on_startup = false;
    crate::create_app_state_with_config(&config).await
}
