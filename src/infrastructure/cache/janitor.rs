//! Background removal of expired document-store records

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::cache::DOCUMENT_STORE_BACKEND;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_backend_error;

/// A store whose expired records must be swept explicitly
#[async_trait]
pub trait ExpiredEntryPurger: Send + Sync {
    /// Deletes every record whose expiry has passed, returning the count
    async fn purge_expired(&self) -> Result<usize, DomainError>;
}

/// Spawns a task that purges expired records every `interval`
///
/// The first sweep runs one full interval after spawning. Failures are logged
/// and the loop keeps going; abort the returned handle to stop it.
pub fn spawn_janitor(purger: Arc<dyn ExpiredEntryPurger>, interval: Duration) -> JoinHandle<()> {
    let period = interval.max(Duration::from_secs(1));

    info!(interval_secs = period.as_secs(), "Starting cache janitor");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep(purger.as_ref()).await;
        }
    })
}

async fn sweep(purger: &dyn ExpiredEntryPurger) -> usize {
    match purger.purge_expired().await {
        Ok(0) => 0,
        Ok(purged) => {
            debug!(purged = purged, "Purged expired cache records");
            purged
        }
        Err(e) => {
            warn!(error = %e, "Cache janitor sweep failed");
            record_backend_error(DOCUMENT_STORE_BACKEND, "purge_expired");
            0
        }
    }
}
