//! Bounded exponential backoff that yields to caller cancellation.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{MongoError, MongoResult};

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the zero-based attempt number. Before every attempt after
/// the first the loop sleeps for [`RetryPolicy::backoff_for_attempt`]; both
/// the sleep and the attempt itself race `cancel`, and cancellation wins with
/// [`MongoError::Cancelled`]. [`MongoError::ClientClosed`] is never retried.
///
/// When every attempt fails the result is [`MongoError::Exhausted`] carrying
/// the total attempt count and the last error.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    phase: &'static str,
    mut op: F,
) -> MongoResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = MongoResult<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut last_error = None;

    for attempt in 0..max_attempts {
        if cancel.is_cancelled() {
            return Err(MongoError::Cancelled(phase));
        }

        let delay = policy.backoff_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(phase, attempt, delay_ms = delay.as_millis() as u64, "Backing off");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MongoError::Cancelled(phase)),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MongoError::Cancelled(phase)),
            outcome = op(attempt) => outcome,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err @ (MongoError::ClientClosed | MongoError::Cancelled(_))) => return Err(err),
            Err(err) => {
                warn!(
                    phase,
                    attempt = attempt + 1,
                    max_attempts,
                    error = %err,
                    "Attempt failed"
                );
                last_error = Some(err);
            }
        }
    }

    let source = last_error.unwrap_or_else(|| MongoError::Internal(format!("{phase} never ran")));
    Err(MongoError::Exhausted {
        phase,
        attempts: max_attempts,
        source: Box::new(source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(100), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_retries_plus_one() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: MongoResult<()> =
            retry_with_backoff(&policy(3), &CancellationToken::new(), "connect", |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(MongoError::connection("refused"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("after 4 attempts"));
        assert!(matches!(err, MongoError::Exhausted { attempts: 4, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_later_attempt() {
        let value = retry_with_backoff(&policy(3), &CancellationToken::new(), "connect", |attempt| async move {
            if attempt < 2 {
                Err(MongoError::connection("not yet"))
            } else {
                Ok(attempt)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_exponential_backoff() {
        let start = tokio::time::Instant::now();
        let _: MongoResult<()> =
            retry_with_backoff(&policy(3), &CancellationToken::new(), "connect", |_| async {
                Err(MongoError::connection("refused"))
            })
            .await;

        // 100ms + 200ms + 400ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(700));
        assert!(elapsed < Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: MongoResult<()> = retry_with_backoff(&policy(3), &cancel, "connect", |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let slow = RetryPolicy::new(3, Duration::from_secs(60), Duration::from_secs(60));
        let start = tokio::time::Instant::now();
        let result: MongoResult<()> = retry_with_backoff(&slow, &cancel, "connect", |_| {
            let counter = Arc::clone(&counter);
            let trigger = trigger.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                trigger.cancel();
                Err(MongoError::connection("refused"))
            }
        })
        .await;

        assert!(matches!(result, Err(MongoError::Cancelled("connect"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_closed_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: MongoResult<()> =
            retry_with_backoff(&policy(3), &CancellationToken::new(), "connect", |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(MongoError::ClientClosed)
                }
            })
            .await;

        assert!(result.unwrap_err().is_client_closed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
