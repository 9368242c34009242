use std::future::Future;
use std::time::Duration;

use angebot_core::SyncError;
use tokio::time::sleep;

/// Run `op` up to `attempts` times, doubling the delay between attempts.
/// Only transient failures are retried; auth and validation errors are
/// returned immediately.
pub async fn with_retry<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let attempts = attempts.max(1);
    let mut delay = base_delay;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                tracing::warn!(
                    system = err.system(),
                    attempt,
                    "transient sync failure, retrying: {err}"
                );
                sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
    unreachable!("loop returns on the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> SyncError {
        SyncError::Transient {
            system: "test".to_string(),
            message: "timeout".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts_on_persistent_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(SyncError::Auth {
                    system: "notion".to_string(),
                    message: "token expired".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result.unwrap_err(), SyncError::Auth { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
