//! Retry executor: drives one operation under a [`RetryPolicy`].
//!
//! Semantics:
//! - The operation is invoked at most `policy.max_attempts()` times.
//! - `Ok` short-circuits; no further attempts are made.
//! - `AttemptError::Retryable` waits `policy.delay_for(attempts)` and tries again, until the
//!   budget is spent; the result then holds the last error as `Failure::Exhausted`.
//! - `AttemptError::NonRetryable` stops immediately as `Failure::Rejected`.
//! - The cancellation token is checked before every invocation and before every pause, and a
//!   pause in progress is raced against it. An element cancelled before its first invocation
//!   reports `attempts = 0`.
//!
//! The pause goes through a [`Sleeper`]; with the default [`TokioSleeper`] it is an await point
//! that leaves other tasks free to run.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use persevere::{AttemptError, InstantSleeper, RetryExecutor, RetryPolicy};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0).unwrap();
//! let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
//!
//! let mut calls = 0;
//! let result = executor
//!     .run(&policy, || {
//!         calls += 1;
//!         let attempt = calls;
//!         async move {
//!             if attempt < 3 {
//!                 Err(AttemptError::retryable("temporary error"))
//!             } else {
//!                 Ok("processed")
//!             }
//!         }
//!     })
//!     .await;
//! assert_eq!(result.value(), Some(&"processed"));
//! assert_eq!(result.attempts(), 3);
//! # });
//! ```

use crate::error::{AttemptError, Failure};
use crate::telemetry::{emit_best_effort, NullSink, PolicyEvent, RetryEvent, TelemetrySink};
use crate::{CallResult, RetryPolicy, Sleeper, TokioSleeper};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs operations under a retry policy, with a shared sleeper, cancellation token, and sink.
///
/// Cloning is cheap; clones share the token, so cancelling one cancels them all.
#[derive(Clone)]
pub struct RetryExecutor<S = NullSink> {
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
    sink: S,
}

impl<S> fmt::Debug for RetryExecutor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("sleeper", &self.sleeper)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("sink", &"<sink>")
            .finish()
    }
}

impl RetryExecutor<NullSink> {
    /// Executor with a tokio sleeper, a fresh token, and no telemetry.
    pub fn new() -> Self {
        Self { sleeper: Arc::new(TokioSleeper), cancel: CancellationToken::new(), sink: NullSink }
    }
}

impl Default for RetryExecutor<NullSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RetryExecutor<S> {
    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<Z>(mut self, sleeper: Z) -> Self
    where
        Z: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Observe an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Deliver events to `sink` instead of the current one.
    pub fn with_sink<S2>(self, sink: S2) -> RetryExecutor<S2> {
        RetryExecutor { sleeper: self.sleeper, cancel: self.cancel, sink }
    }

    /// The token this executor observes.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Signal cancellation to this executor and every clone of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<S> RetryExecutor<S>
where
    S: TelemetrySink,
    S::Future: Send + 'static,
{
    /// Invoke `operation` until it succeeds, is rejected, runs out of attempts, or is cancelled.
    pub async fn run<T, E, Fut, Op>(&self, policy: &RetryPolicy, mut operation: Op) -> CallResult<T, E>
    where
        E: fmt::Display,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
        Op: FnMut() -> Fut,
    {
        let started = Instant::now();
        let mut attempts = 0;

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(attempts).await;
            }
            attempts += 1;

            let error = match operation().await {
                Ok(value) => {
                    tracing::debug!(attempts, "operation succeeded");
                    return CallResult::Ok { value, attempts };
                }
                Err(AttemptError::NonRetryable(rejection)) => {
                    tracing::warn!(attempt = attempts, reason = %rejection, "operation rejected");
                    self.emit(RetryEvent::Rejected { attempt: attempts }).await;
                    return CallResult::Err { failure: Failure::Rejected(rejection), attempts };
                }
                Err(AttemptError::Retryable(error)) => error,
            };

            if attempts >= policy.max_attempts() {
                let total_duration = started.elapsed();
                tracing::warn!(attempts, error = %error, "retry budget exhausted");
                self.emit(RetryEvent::Exhausted { total_attempts: attempts, total_duration }).await;
                return CallResult::Err { failure: Failure::Exhausted(error), attempts };
            }

            if self.cancel.is_cancelled() {
                return self.cancelled(attempts).await;
            }

            let delay = policy.delay_for(attempts);
            tracing::debug!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, backing off"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(attempts).await,
                _ = self.sleeper.sleep(delay) => {}
            }
            self.emit(RetryEvent::Attempt { attempt: attempts + 1, delay }).await;
        }
    }

    /// Record cancellation after `attempts` invocations.
    pub(crate) async fn cancelled<T, E>(&self, attempts: usize) -> CallResult<T, E> {
        tracing::debug!(attempts, "cancelled");
        self.emit(RetryEvent::Cancelled { attempts }).await;
        CallResult::cancelled(attempts)
    }

    pub(crate) async fn emit(&self, event: impl Into<PolicyEvent>) {
        emit_best_effort(self.sink.clone(), event.into()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::{Backoff, InstantSleeper, Jitter, TrackingSleeper};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestError(String);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "TestError: {}", self.0)
        }
    }

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(max_attempts)
            .backoff(Backoff::constant(Duration::from_millis(10)))
            .build()
            .expect("builder")
    }

    #[tokio::test]
    async fn success_first_attempt() {
        let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
        let counter = Arc::new(AtomicUsize::new(0));

        let result = executor
            .run(&policy(3), || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, AttemptError<TestError>>(42)
                }
            })
            .await;

        assert_eq!(result, CallResult::Ok { value: 42, attempts: 1 });
        assert_eq!(counter.load(Ordering::SeqCst), 1, "Should only execute once");
    }

    #[tokio::test]
    async fn success_on_attempt_k_stops_there() {
        let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
        for k in 1..=5 {
            let counter = Arc::new(AtomicUsize::new(0));
            let result = executor
                .run(&policy(5), || {
                    let counter = counter.clone();
                    async move {
                        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        if attempt < k {
                            Err(AttemptError::retryable(TestError(format!("attempt {}", attempt))))
                        } else {
                            Ok(attempt)
                        }
                    }
                })
                .await;
            assert_eq!(result, CallResult::Ok { value: k, attempts: k });
            assert_eq!(counter.load(Ordering::SeqCst), k, "no attempt after success");
        }
    }

    #[tokio::test]
    async fn always_retryable_uses_full_budget() {
        let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
        for n in 1..=6 {
            let counter = Arc::new(AtomicUsize::new(0));
            let result = executor
                .run(&policy(n), || {
                    let counter = counter.clone();
                    async move {
                        let attempt = counter.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(AttemptError::retryable(TestError(format!("attempt {}", attempt))))
                    }
                })
                .await;
            assert_eq!(result.attempts(), n);
            assert_eq!(counter.load(Ordering::SeqCst), n);
            // last failure is kept
            assert_eq!(
                result.failure(),
                Some(&Failure::Exhausted(TestError(format!("attempt {}", n - 1))))
            );
        }
    }

    #[tokio::test]
    async fn non_retryable_fails_fast() {
        let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
        let counter = Arc::new(AtomicUsize::new(0));

        let result = executor
            .run(&policy(10), || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), AttemptError<TestError>>(AttemptError::validation(
                        "email",
                        "Email is required",
                    ))
                }
            })
            .await;

        assert_eq!(result.attempts(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "Should not retry non-retryable error");
        assert_eq!(
            result.failure(),
            Some(&Failure::Rejected(Rejection::validation("email", "Email is required")))
        );
    }

    #[tokio::test]
    async fn rejection_after_retries_keeps_attempt_count() {
        let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
        let mut calls = 0;
        let result = executor
            .run(&policy(5), || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 2 {
                        Err::<(), _>(AttemptError::retryable(TestError("flaky".into())))
                    } else {
                        Err(AttemptError::business("SALDO_INSUFICIENTE", "insufficient balance"))
                    }
                }
            })
            .await;
        assert_eq!(result.attempts(), 2);
        assert!(result.failure().is_some_and(Failure::is_rejected));
    }

    #[tokio::test]
    async fn backoff_schedule_is_applied() {
        let sleeper = TrackingSleeper::new();
        let executor = RetryExecutor::new().with_sleeper(sleeper.clone());
        let policy = RetryPolicy::builder()
            .max_attempts(4)
            .backoff(Backoff::exponential(Duration::from_millis(100)))
            .with_jitter(Jitter::None)
            .build()
            .expect("builder");

        let _ = executor
            .run(&policy, || async {
                Err::<(), _>(AttemptError::retryable(TestError("fail".to_string())))
            })
            .await;

        // Exponential: 100ms, 200ms, 400ms; no pause after the last attempt
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(100), Duration::from_millis(200), Duration::from_millis(400)]
        );
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_attempts() {
        let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
        executor.cancel();
        let counter = AtomicUsize::new(0);

        let result = executor
            .run(&policy(3), || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, AttemptError<TestError>>(()) }
            })
            .await;

        assert!(result.is_cancelled());
        assert_eq!(result.attempts(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_is_checked_before_sleeping() {
        let sleeper = TrackingSleeper::new();
        let executor = RetryExecutor::new().with_sleeper(sleeper.clone());
        let token = executor.cancellation_token().clone();

        let result = executor
            .run(&policy(5), || {
                token.cancel();
                async { Err::<(), _>(AttemptError::retryable(TestError("down".into()))) }
            })
            .await;

        assert!(result.is_cancelled());
        assert_eq!(result.attempts(), 1);
        assert_eq!(sleeper.call_count(), 0, "no pause once cancelled");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_pause() {
        let executor = RetryExecutor::new();
        let token = executor.cancellation_token().clone();
        let policy = RetryPolicy::new(3, Duration::from_secs(60), 1.0).expect("policy");

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = executor
            .run(&policy, || async {
                Err::<(), _>(AttemptError::retryable(TestError("down".into())))
            })
            .await;
        canceller.await.expect("canceller");

        assert!(result.is_cancelled());
        assert_eq!(result.attempts(), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn works_with_string_errors() {
        let executor = RetryExecutor::new().with_sleeper(InstantSleeper);
        let result = executor
            .run(&policy(2), || async { Err::<(), _>(AttemptError::retryable("API timeout".to_string())) })
            .await;
        assert_eq!(result.reason().as_deref(), Some("API timeout"));
    }
}
