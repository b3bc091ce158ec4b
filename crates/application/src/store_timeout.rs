use std::future::Future;
use std::time::Duration;

use leasegate_core::{AppError, AppResult};

/// Default bound applied to every remote store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs a store operation and maps an elapsed timeout to an internal error.
pub(crate) async fn within_store_timeout<T>(
    timeout: Duration,
    operation: &str,
    future: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| {
            AppError::Internal(format!(
                "{operation} timed out after {}ms",
                timeout.as_millis()
            ))
        })?
}
