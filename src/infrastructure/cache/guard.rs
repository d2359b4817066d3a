//! Failure absorption shared by the backend adapters

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::DomainError;
use crate::infrastructure::observability::record_backend_error;

/// Runs a backend operation under a timeout, converting any failure into
/// `fallback` after logging it
pub(crate) async fn guarded<T, F>(
    backend: &'static str,
    operation: &'static str,
    target: &str,
    timeout: Duration,
    fallback: T,
    fut: F,
) -> T
where
    F: Future<Output = Result<T, DomainError>>,
{
    let error = match within(backend, operation, timeout, fut).await {
        Ok(value) => return value,
        Err(e) => e,
    };

    absorb(backend, operation, target, &error);
    fallback
}

/// Bounds a single backend call by `timeout`
pub(crate) async fn within<T, F>(
    backend: &'static str,
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        DomainError::timeout(
            format!("{} {}", backend, operation),
            timeout.as_millis() as u64,
        )
    })?
}

/// Logs and counts a failure that is not propagated
pub(crate) fn absorb(
    backend: &'static str,
    operation: &'static str,
    target: &str,
    error: &DomainError,
) {
    warn!(
        backend = backend,
        operation = operation,
        target = %target,
        error = %error,
        "Cache backend operation failed; degrading"
    );
    record_backend_error(backend, operation);
}
