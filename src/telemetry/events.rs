use crate::batch::BatchStats;
use std::fmt;
use std::time::Duration;

/// Events emitted while retrying operations and running batches.
///
/// Events can be collected, aggregated, or forwarded by any
/// [`TelemetrySink`](super::TelemetrySink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyEvent {
    /// Retry executor events
    Retry(RetryEvent),
    /// Batch runner events
    Batch(BatchEvent),
}

/// Events emitted by the retry executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    /// A retry attempt is about to be made.
    ///
    /// Emitted once the backoff pause has elapsed, right before the operation is invoked again.
    /// A pause interrupted by cancellation produces `Cancelled` instead.
    Attempt {
        /// The attempt about to be made (1-indexed, so always >= 2)
        attempt: usize,
        /// The backoff delay before this retry
        delay: Duration,
    },
    /// All retry attempts have been exhausted.
    Exhausted {
        /// Total number of attempts made
        total_attempts: usize,
        /// Total time spent retrying
        total_duration: Duration,
    },
    /// The operation signalled a non-retryable failure.
    Rejected {
        /// The attempt that was rejected
        attempt: usize,
    },
    /// The cancellation token stopped the executor.
    Cancelled {
        /// Attempts made before cancellation (0 if the element never started)
        attempts: usize,
    },
}

/// Events emitted by the batch runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEvent {
    /// A batch is about to be processed.
    Started { total: usize },
    /// Every element of a batch has a result.
    Completed { stats: BatchStats, elapsed: Duration },
}

impl fmt::Display for PolicyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyEvent::Retry(event) => write!(f, "Retry::{}", event),
            PolicyEvent::Batch(event) => write!(f, "Batch::{}", event),
        }
    }
}

impl fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryEvent::Attempt { attempt, delay } => {
                write!(f, "Attempt(#{}, delay={:?})", attempt, delay)
            }
            RetryEvent::Exhausted { total_attempts, total_duration } => {
                write!(f, "Exhausted(attempts={}, duration={:?})", total_attempts, total_duration)
            }
            RetryEvent::Rejected { attempt } => write!(f, "Rejected(#{})", attempt),
            RetryEvent::Cancelled { attempts } => write!(f, "Cancelled(attempts={})", attempts),
        }
    }
}

impl fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchEvent::Started { total } => write!(f, "Started(total={})", total),
            BatchEvent::Completed { stats, elapsed } => write!(
                f,
                "Completed(total={}, succeeded={}, failed={}, retries={}, elapsed={:?})",
                stats.total, stats.succeeded, stats.failed, stats.total_retries, elapsed
            ),
        }
    }
}

impl From<RetryEvent> for PolicyEvent {
    fn from(event: RetryEvent) -> Self {
        PolicyEvent::Retry(event)
    }
}

impl From<BatchEvent> for PolicyEvent {
    fn from(event: BatchEvent) -> Self {
        PolicyEvent::Batch(event)
    }
}
