//! Retry and timeout utilities.
//!
//! The realtime feed dial loop is the only caller that retries: REST calls
//! are issued exactly once.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Bounded retry with a fixed pause between attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first attempt.
    pub max_attempts: usize,
    /// Pause after each failed attempt that is followed by another.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Returns a policy that waits the same `delay` between every attempt.
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` is reached.
///
/// `op` receives the 1-based attempt number. The last error is returned once
/// attempts run out.
pub async fn retry_async<T, E, Op, Fut>(policy: &RetryPolicy, mut op: Op) -> Result<T, E>
where
    Op: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt >= max_attempts {
            return Err(error);
        }

        debug!(
            event = "retry_attempt_failed",
            attempt,
            max_attempts,
            delay_ms = policy.delay.as_millis() as u64
        );
        if !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
        attempt += 1;
    }
}

/// Applies a timeout to an async computation.
pub async fn with_timeout<T, Fut>(
    timeout: Duration,
    future: Fut,
) -> Result<T, tokio::time::error::Elapsed>
where
    Fut: Future<Output = T>,
{
    tokio::time::timeout(timeout, future).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::{retry_async, with_timeout, RetryPolicy};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime")
    }

    #[test]
    fn retries_until_success() {
        runtime().block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

            let result = retry_async(&policy, {
                let calls = Arc::clone(&calls);
                move |_| {
                    let calls = Arc::clone(&calls);
                    async move {
                        let value = calls.fetch_add(1, Ordering::SeqCst);
                        if value < 2 {
                            Err("retry")
                        } else {
                            Ok("ok")
                        }
                    }
                }
            })
            .await;

            assert_eq!(result.expect("success"), "ok");
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        });
    }

    #[test]
    fn returns_last_error_when_attempts_run_out() {
        runtime().block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

            let result: Result<(), usize> = retry_async(&policy, {
                let calls = Arc::clone(&calls);
                move |attempt| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(attempt)
                    }
                }
            })
            .await;

            assert_eq!(result.expect_err("expected failure"), 3);
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        });
    }

    #[test]
    fn waits_the_fixed_delay_between_attempts() {
        runtime().block_on(async {
            let policy = RetryPolicy::fixed(3, Duration::from_millis(20));
            let started = Instant::now();

            let result: Result<(), ()> = retry_async(&policy, |_| async { Err(()) }).await;

            assert!(result.is_err());
            assert!(started.elapsed() >= Duration::from_millis(40));
        });
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        runtime().block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let policy = RetryPolicy::fixed(0, Duration::ZERO);

            let result: Result<(), ()> = retry_async(&policy, {
                let calls = Arc::clone(&calls);
                move |_| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(())
                    }
                }
            })
            .await;

            assert!(result.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn timeout_elapses_for_pending_future() {
        runtime().block_on(async {
            let result = with_timeout(
                Duration::from_millis(5),
                std::future::pending::<()>(),
            )
            .await;
            assert!(result.is_err());
        });
    }
}
