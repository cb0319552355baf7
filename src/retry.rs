//! Retry policy: how many times to try and how long to wait in between.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries) and is always >= 1.
//! - After the `n`-th failed attempt the executor waits `backoff.delay(n)`, then applies jitter.
//! - The policy is plain data. It holds no sleeper, clock, or predicate, so it can be shared
//!   read-only by every element of a batch and its schedule can be tested on its own.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use persevere::{Backoff, RetryPolicy};
//!
//! let policy = RetryPolicy::builder()
//!     .max_attempts(3) // total attempts
//!     .backoff(Backoff::exponential(Duration::from_millis(100)))
//!     .build()
//!     .unwrap();
//! assert_eq!(policy.delay_for(1), Duration::from_millis(100));
//! assert_eq!(policy.delay_for(2), Duration::from_millis(200));
//! ```

use crate::backoff::BackoffError;
use crate::{Backoff, Jitter};
use std::time::Duration;
use thiserror::Error;

/// Total attempts used when the builder is not told otherwise.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Pause between attempts used when the builder is not told otherwise.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Immutable retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: usize,
    backoff: Backoff,
    jitter: Jitter,
}

/// Errors produced while building a retry policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// `max_attempts` must be > 0.
    #[error("max_attempts must be > 0 (got {0})")]
    InvalidMaxAttempts(usize),
    #[error(transparent)]
    Backoff(#[from] BackoffError),
}

impl RetryPolicy {
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// Policy with a geometric schedule: `base_delay * delay_multiplier^(n - 1)` after failure `n`.
    pub fn new(
        max_attempts: usize,
        base_delay: Duration,
        delay_multiplier: f64,
    ) -> Result<Self, BuildError> {
        Self::builder()
            .max_attempts(max_attempts)
            .backoff(Backoff::geometric(base_delay, delay_multiplier)?)
            .build()
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    /// Pause after `failed_attempts` failures, jitter included.
    pub fn delay_for(&self, failed_attempts: usize) -> Duration {
        self.jitter.apply(self.backoff.delay(failed_attempts))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::constant(DEFAULT_BASE_DELAY),
            jitter: Jitter::None,
        }
    }
}

/// Builder for `RetryPolicy`.
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: usize,
    backoff: Backoff,
    jitter: Jitter,
}

impl RetryPolicyBuilder {
    /// Create a builder with the defaults: 3 attempts, fixed 1s pause, no jitter.
    pub fn new() -> Self {
        let RetryPolicy { max_attempts, backoff, jitter } = RetryPolicy::default();
        Self { max_attempts, backoff, jitter }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set backoff strategy.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set jitter strategy.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Build the retry policy, validating inputs.
    pub fn build(self) -> Result<RetryPolicy, BuildError> {
        if self.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts(0));
        }
        Ok(RetryPolicy { max_attempts: self.max_attempts, backoff: self.backoff, jitter: self.jitter })
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
