//! Cancellable operations with a hard deadline

use super::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `operation` until it completes, `cancel` fires, or `timeout` elapses.
///
/// Exactly one of the three outcomes is observed. On cancellation or
/// timeout the operation future is dropped before returning, which for an
/// HTTP request closes the underlying connection.
pub async fn with_deadline<F, T>(
    operation: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;

        () = cancel.cancelled() => Err(ApiError::cancelled()),

        result = operation => result,

        () = tokio::time::sleep(timeout) => Err(ApiError::timeout()),
    }
}
