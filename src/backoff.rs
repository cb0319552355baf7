//! Backoff schedules for retry policies.
//!
//! Attempt semantics: `delay(n)` is the pause after the `n`-th failed attempt, before attempt
//! `n + 1`. `delay(0)` is always zero (nothing has failed yet).
//!
//! - Geometric: `base * multiplier^(n - 1)`, floored to whole milliseconds. A multiplier of 1 is a
//!   fixed pause, 2 is classic exponential backoff.
//! - Linear: `base * n` (e.g. "wait one second times the attempt number").
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use persevere::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(100))
//!     .with_max(Duration::from_secs(2))
//!     .unwrap();
//! assert_eq!(backoff.delay(0), Duration::ZERO);
//! assert_eq!(backoff.delay(1), Duration::from_millis(100));
//! assert_eq!(backoff.delay(2), Duration::from_millis(200));
//! assert_eq!(backoff.delay(6), Duration::from_secs(2)); // capped
//! ```
//!
//! Overflow behavior: computations that would overflow saturate to `MAX_BACKOFF` (1 day).

use std::time::Duration;
use thiserror::Error;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackoffError {
    #[error("delay multiplier must be a finite number >= 1 (got {0})")]
    InvalidMultiplier(f64),
    #[error("max must be greater than zero")]
    MaxMustBePositive,
    #[error("max ({max:?}) must be >= base ({base:?})")]
    MaxLessThanBase { base: Duration, max: Duration },
}

#[derive(Debug, Clone, PartialEq)]
enum Schedule {
    Geometric { multiplier: f64 },
    Linear,
}

/// Delay schedule between attempts. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    base: Duration,
    schedule: Schedule,
    max: Option<Duration>,
}

impl Backoff {
    /// Same pause before every retry.
    pub fn constant(delay: Duration) -> Self {
        Self { base: delay, schedule: Schedule::Geometric { multiplier: 1.0 }, max: None }
    }

    /// Pause grows by `base` each retry.
    pub fn linear(base: Duration) -> Self {
        Self { base, schedule: Schedule::Linear, max: None }
    }

    /// Pause doubles each retry.
    pub fn exponential(base: Duration) -> Self {
        Self { base, schedule: Schedule::Geometric { multiplier: 2.0 }, max: None }
    }

    /// Pause is multiplied by `multiplier` each retry. `multiplier` must be finite and >= 1.
    pub fn geometric(base: Duration, multiplier: f64) -> Result<Self, BackoffError> {
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(BackoffError::InvalidMultiplier(multiplier));
        }
        Ok(Self { base, schedule: Schedule::Geometric { multiplier }, max: None })
    }

    /// Cap every delay at `max`. Fails if `max` is zero or below the base delay.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        if max < self.base {
            return Err(BackoffError::MaxLessThanBase { base: self.base, max });
        }
        self.max = Some(max);
        Ok(self)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Growth factor per retry; `None` for linear schedules.
    pub fn multiplier(&self) -> Option<f64> {
        match self.schedule {
            Schedule::Geometric { multiplier } => Some(multiplier),
            Schedule::Linear => None,
        }
    }

    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    /// Delay to wait after `attempt` failed attempts (0 = none failed yet, no delay).
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 || self.base.is_zero() {
            return Duration::ZERO;
        }
        let raw = match self.schedule {
            Schedule::Geometric { multiplier } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
                let millis = (self.base.as_millis() as f64 * multiplier.powi(exponent)).floor();
                if !millis.is_finite() || millis >= MAX_BACKOFF.as_millis() as f64 {
                    MAX_BACKOFF
                } else {
                    Duration::from_millis(millis as u64)
                }
            }
            Schedule::Linear => {
                let attempt_u32 = attempt.min(u32::MAX as usize) as u32; // clamp to prevent truncation
                self.base.checked_mul(attempt_u32).unwrap_or(MAX_BACKOFF)
            }
        };
        let capped = self.max.map(|m| raw.min(m)).unwrap_or(raw);
        capped.min(MAX_BACKOFF)
    }
}
