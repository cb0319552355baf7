//! Convenient re-exports for common types.
pub use crate::{
    backoff::{Backoff, BackoffError, MAX_BACKOFF},
    batch::{BatchReport, BatchRunner, BatchStats},
    error::{AttemptError, Failure, Rejection},
    executor::RetryExecutor,
    jitter::Jitter,
    outcome::CallResult,
    retry::{BuildError, RetryPolicy, RetryPolicyBuilder},
    sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper},
    CancellationToken,
};

#[cfg(feature = "config")]
pub use crate::config::{ConfigError, PolicyConfig};
