//! Wall-clock bound for the startup wait.

use spadev_core::{DevServerError, DevServerResult};
use std::future::Future;
use std::time::Duration;

/// Race `future` against a timer of `duration`.
///
/// On expiry fails with [`DevServerError::Timeout`], whose message names the
/// timeout and points at the log output. The raced future is only dropped,
/// never cancelled in any deeper sense: when it is a spawned task or a shared
/// handle to one, the underlying work keeps running and its result is
/// available to the next caller.
pub async fn with_timeout<F, T>(future: F, duration: Duration) -> DevServerResult<T>
where
    F: Future<Output = DevServerResult<T>>,
{
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or(Err(DevServerError::Timeout { timeout: duration }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_pending_future_times_out_with_descriptive_message() {
        let started = Instant::now();
        let result = with_timeout(
            std::future::pending::<DevServerResult<u16>>(),
            Duration::from_millis(50),
        )
        .await;
        let elapsed = started.elapsed();

        let err = assert_err!(result);
        assert_eq!(
            err,
            DevServerError::Timeout {
                timeout: Duration::from_millis(50)
            }
        );
        assert!(err.to_string().contains("50"));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_ready_future_wins() {
        let port = assert_ok!(with_timeout(async { Ok(5173_u16) }, Duration::from_secs(1)).await);
        assert_eq!(port, 5173);
    }

    #[tokio::test]
    async fn test_inner_error_is_passed_through() {
        let result: DevServerResult<u16> = with_timeout(
            async { Err(DevServerError::Internal("boom".to_string())) },
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result, Err(DevServerError::Internal("boom".to_string())));
    }

    #[tokio::test]
    async fn test_spawned_loser_keeps_running() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(());
            Ok::<_, DevServerError>(())
        });

        let result = with_timeout(
            async move { task.await.map_err(DevServerError::internal)? },
            Duration::from_millis(10),
        )
        .await;
        assert!(matches!(result, Err(DevServerError::Timeout { .. })));

        // The detached task still completes after the race was lost
        assert_ok!(rx.await);
    }
}
