//! Per-element outcome of a retried call.

use crate::error::Failure;
use std::fmt;

/// Tagged result of driving one operation under a [`RetryPolicy`](crate::RetryPolicy).
///
/// `attempts` is the number of times the operation was actually invoked. It is at least 1 and at
/// most the policy's `max_attempts`, except for elements cancelled before they started, which
/// report 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult<T, E> {
    /// The operation produced a value.
    Ok { value: T, attempts: usize },
    /// The operation did not produce a value.
    Err { failure: Failure<E>, attempts: usize },
}

impl<T, E> CallResult<T, E> {
    pub(crate) fn cancelled(attempts: usize) -> Self {
        CallResult::Err { failure: Failure::Cancelled, attempts }
    }

    /// Number of invocations made for this element.
    pub fn attempts(&self) -> usize {
        match self {
            CallResult::Ok { attempts, .. } | CallResult::Err { attempts, .. } => *attempts,
        }
    }

    /// Invocations beyond the first.
    pub fn retries(&self) -> usize {
        self.attempts().saturating_sub(1)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CallResult::Ok { .. })
    }

    pub fn is_err(&self) -> bool {
        matches!(self, CallResult::Err { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CallResult::Err { failure: Failure::Cancelled, .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            CallResult::Ok { value, .. } => Some(value),
            CallResult::Err { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure<E>> {
        match self {
            CallResult::Ok { .. } => None,
            CallResult::Err { failure, .. } => Some(failure),
        }
    }

    /// Drop the attempt count and convert into a plain `Result`.
    pub fn into_result(self) -> Result<T, Failure<E>> {
        match self {
            CallResult::Ok { value, .. } => Ok(value),
            CallResult::Err { failure, .. } => Err(failure),
        }
    }
}

impl<T, E: fmt::Display> CallResult<T, E> {
    /// Human-readable failure reason, `None` on success.
    pub fn reason(&self) -> Option<String> {
        self.failure().map(ToString::to_string)
    }
}
