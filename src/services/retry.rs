//! Bounded retry for idempotent storage writes.

use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::dao::storage::StorageResult;

const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(2);

/// Run `operation` up to `attempts` times, sleeping with exponential backoff
/// and random jitter between failures. Only use it for writes whose replay
/// yields the same row.
pub async fn retry_idempotent<T, F, Fut>(
    attempts: u32,
    operation_name: &'static str,
    mut operation: F,
) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let attempts = attempts.max(1);
    let mut delay = BASE_DELAY;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "storage write failed; retrying"
                );
                sleep(jittered(delay)).await;
                delay = (delay * 2).min(MAX_DELAY);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn jittered(delay: Duration) -> Duration {
    let half = delay.as_millis() as u64 / 2;
    let jitter = rand::rng().random_range(0..=half);
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::dao::storage::StorageError;

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_absorbed() {
        let calls = AtomicU32::new(0);
        let result = retry_idempotent(3, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StorageError::corrupted("flaky"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_last_attempt() {
        let calls = AtomicU32::new(0);
        let result: StorageResult<()> = retry_idempotent(2, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StorageError::corrupted("down")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn jitter_stays_within_the_delay() {
        for _ in 0..100 {
            let delay = jittered(Duration::from_millis(400));
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(400));
        }
    }
}
