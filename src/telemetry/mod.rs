//! Telemetry for retries and batches.
//!
//! The executor and batch runner emit structured [`PolicyEvent`]s to a [`TelemetrySink`], which
//! is a `tower::Service<PolicyEvent>`. Delivery is best-effort: a failing or unready sink never
//! affects the outcome of an operation.
//!
//! - **Retry**: `Attempt`, `Exhausted`, `Rejected`, `Cancelled`
//! - **Batch**: `Started`, `Completed`
//!
//! ```rust
//! use persevere::telemetry::{PolicyEvent, RetryEvent};
//! use std::time::Duration;
//!
//! let event = PolicyEvent::Retry(RetryEvent::Attempt {
//!     attempt: 2,
//!     delay: Duration::from_millis(100),
//! });
//! assert_eq!(event.to_string(), "Retry::Attempt(#2, delay=100ms)");
//! ```

pub mod events;
pub mod sinks;

pub use events::{BatchEvent, PolicyEvent, RetryEvent};
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};
