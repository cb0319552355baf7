#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # persevere
//!
//! Bounded retry with backoff for async operations, and a batch runner that applies it to every
//! element of a sequence.
//!
//! ## Features
//!
//! - **Retry policies** as plain data: attempt budget, geometric or linear backoff, optional jitter
//! - **Typed failure classification**: retryable errors back off, rejections fail fast
//! - **Batch runner** with order-preserving concurrency, per-element isolation, derived stats
//! - **Cancellation** via `tokio_util`'s `CancellationToken`, checked at every attempt boundary
//! - **Telemetry** events delivered to `tower::Service` sinks, plus `tracing` logs
//! - **Config** (feature `config`): build policies from JSON with serde
//!
//! ## Quick Start
//!
//! ```rust
//! use persevere::{AttemptError, BatchRunner, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let policy = RetryPolicy::new(3, Duration::from_millis(10), 2.0).unwrap();
//!     let runner = BatchRunner::new(RetryExecutor::new()).with_concurrency(4);
//!
//!     let report = runner
//!         .run_all(
//!             ["a", "b", "c"],
//!             |id| move || async move {
//!                 // Your fallible call here
//!                 Ok::<_, AttemptError<std::io::Error>>(id.to_uppercase())
//!             },
//!             &policy,
//!         )
//!         .await;
//!
//!     assert_eq!(report.stats.succeeded, 3);
//! }
//! ```

pub mod backoff;
pub mod batch;
#[cfg(feature = "config")]
pub mod config;
pub mod error;
pub mod executor;
pub mod jitter;
pub mod outcome;
pub mod prelude;
pub mod retry;
pub mod sleeper;
pub mod telemetry;

// Re-exports
pub use backoff::{Backoff, BackoffError};
pub use batch::{BatchReport, BatchRunner, BatchStats};
pub use error::{AttemptError, Failure, Rejection};
pub use executor::RetryExecutor;
pub use jitter::Jitter;
pub use outcome::CallResult;
pub use retry::{BuildError, RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use tokio_util::sync::CancellationToken;
