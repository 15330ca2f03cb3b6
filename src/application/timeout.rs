use std::future::Future;
use std::time::Duration;

use crate::domain::{DomainError, Result};

/// Runs a collaborator call under `limit`; expiry becomes a retryable
/// `Timeout` error.
pub async fn with_timeout<T>(
    limit: Duration,
    operation: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call).await.map_err(|_| {
        DomainError::timeout(format!("{operation} exceeded {}ms", limit.as_millis()))
    })?
}
