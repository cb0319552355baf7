//! Batch runner: one retried operation per input element, results in input order.
//!
//! Guarantees:
//! - `results[i]` belongs to `elements[i]` and `results.len() == elements.len()`, whatever the
//!   concurrency.
//! - Every element starts with a fresh attempt count; one element's failure never stops the others.
//! - After cancellation, elements that have not started are not built or invoked. They get
//!   `Failure::Cancelled` with `attempts = 0`.
//! - [`BatchStats`] is computed from the finished results, never accumulated while running.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use persevere::{AttemptError, BatchRunner, InstantSleeper, RetryExecutor, RetryPolicy};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0).unwrap();
//! let runner = BatchRunner::new(RetryExecutor::new().with_sleeper(InstantSleeper));
//!
//! let report = runner
//!     .run_all(
//!         vec![4, -1, 9],
//!         |n: i32| move || async move {
//!             if n < 0 {
//!                 Err(AttemptError::<String>::validation("n", "must not be negative"))
//!             } else {
//!                 Ok(n * 2)
//!             }
//!         },
//!         &policy,
//!     )
//!     .await;
//! assert_eq!(report.results.len(), 3);
//! assert_eq!(report.stats.succeeded, 2);
//! assert_eq!(report.stats.failed, 1);
//! # });
//! ```

use crate::error::{AttemptError, Failure};
use crate::telemetry::{BatchEvent, NullSink, TelemetrySink};
use crate::{CallResult, RetryExecutor, RetryPolicy};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Aggregate counters for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    /// Includes cancelled elements.
    pub failed: usize,
    /// Sum of `attempts - 1` over every element that made at least one attempt.
    pub total_retries: usize,
    pub cancelled: usize,
}

impl BatchStats {
    /// Derive stats by scanning finished results.
    pub fn from_results<T, E>(results: &[CallResult<T, E>]) -> Self {
        results.iter().fold(Self { total: results.len(), ..Self::default() }, |mut stats, r| {
            match r {
                CallResult::Ok { .. } => stats.succeeded += 1,
                CallResult::Err { failure, .. } => {
                    stats.failed += 1;
                    if failure.is_cancelled() {
                        stats.cancelled += 1;
                    }
                }
            }
            stats.total_retries += r.retries();
            stats
        })
    }

    /// Percentage of elements that succeeded; 0.0 for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64 * 100.0
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone)]
pub struct BatchReport<T, E> {
    /// One result per input element, in input order.
    pub results: Vec<CallResult<T, E>>,
    pub stats: BatchStats,
    /// Wall time from the first element starting to the last one finishing.
    pub elapsed: Duration,
}

impl<T, E> BatchReport<T, E> {
    /// `(index, failure)` for every failed element, in input order.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Failure<E>)> + '_ {
        self.results.iter().enumerate().filter_map(|(i, r)| r.failure().map(|f| (i, f)))
    }

    /// Values of the successful elements, in input order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.results.iter().filter_map(CallResult::value)
    }
}

/// Applies a [`RetryExecutor`] to every element of a sequence.
#[derive(Debug, Clone)]
pub struct BatchRunner<S = NullSink> {
    executor: RetryExecutor<S>,
    concurrency: usize,
}

impl<S> BatchRunner<S> {
    /// Sequential runner (one element at a time).
    pub fn new(executor: RetryExecutor<S>) -> Self {
        Self { executor, concurrency: 1 }
    }

    /// Process up to `concurrency` elements at once. Output order is unaffected.
    ///
    /// # Panics
    /// If `concurrency` is zero.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        assert!(concurrency > 0, "batch concurrency must be at least 1");
        self.concurrency = concurrency;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn executor(&self) -> &RetryExecutor<S> {
        &self.executor
    }
}

impl<S> BatchRunner<S>
where
    S: TelemetrySink,
    S::Future: Send + 'static,
{
    /// Run every element through the executor and collect results plus derived stats.
    ///
    /// `to_operation` turns an element into the retryable operation for it; it is only called
    /// for elements that actually start.
    pub async fn run_all<I, F, Op, Fut, T, E>(
        &self,
        elements: I,
        mut to_operation: F,
        policy: &RetryPolicy,
    ) -> BatchReport<T, E>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Op,
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
        E: fmt::Display,
    {
        let started = Instant::now();
        let elements: Vec<I::Item> = elements.into_iter().collect();
        let total = elements.len();

        tracing::info!(total, concurrency = self.concurrency, "batch started");
        self.executor.emit(BatchEvent::Started { total }).await;

        let executor = &self.executor;
        let results: Vec<CallResult<T, E>> = stream::iter(elements.into_iter().enumerate())
            .map(|(index, element)| {
                let operation = if executor.is_cancelled() {
                    None
                } else {
                    Some(to_operation(element))
                };
                async move {
                    match operation {
                        Some(operation) => executor.run(policy, operation).await,
                        None => executor.cancelled(0).await,
                    }
                }
                .instrument(tracing::debug_span!("batch_element", index))
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let stats = BatchStats::from_results(&results);
        let elapsed = started.elapsed();
        tracing::info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            cancelled = stats.cancelled,
            total_retries = stats.total_retries,
            elapsed_ms = elapsed.as_millis() as u64,
            "batch finished"
        );
        self.executor.emit(BatchEvent::Completed { stats, elapsed }).await;

        BatchReport { results, stats, elapsed }
    }
}
