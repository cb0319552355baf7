//! Error taxonomy for retried operations.
//!
//! Two layers:
//! - [`AttemptError`] is what an operation returns from a single attempt. The variant decides
//!   retry eligibility: `Retryable` failures go through backoff, `NonRetryable` ones fail fast.
//! - [`Failure`] is what a finished [`CallResult`](crate::CallResult) records: the last retryable
//!   error after the budget ran out, a rejection, or cancellation.
//!
//! Rejections carry structured reasons (field-level validation, coded business rules) so callers
//! can branch on them without inspecting error types at runtime.

use thiserror::Error;

/// Outcome of a single failed attempt, classified by the operation itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError<E> {
    /// Transient failure, eligible for another attempt after backoff.
    #[error("{0}")]
    Retryable(E),
    /// Permanent failure; the executor stops immediately.
    #[error("{0}")]
    NonRetryable(Rejection<E>),
}

impl<E> AttemptError<E> {
    /// Wrap a transient error.
    pub fn retryable(error: E) -> Self {
        AttemptError::Retryable(error)
    }

    /// Reject because a field failed validation.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AttemptError::NonRetryable(Rejection::validation(field, message))
    }

    /// Reject because a business rule does not hold.
    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        AttemptError::NonRetryable(Rejection::business(code, message))
    }

    /// Reject with an arbitrary permanent error.
    pub fn fatal(error: E) -> Self {
        AttemptError::NonRetryable(Rejection::Fatal(error))
    }

    /// True for the `Retryable` variant.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Retryable(_))
    }
}

/// Structured reason for a non-retryable failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection<E> {
    /// Input did not pass validation.
    #[error("validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },
    /// A business rule rejected the input.
    #[error("business rule {code} violated: {message}")]
    Business { code: String, message: String },
    /// Any other permanent failure.
    #[error("{0}")]
    Fatal(E),
}

impl<E> Rejection<E> {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Rejection::Validation { field: field.into(), message: message.into() }
    }

    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        Rejection::Business { code: code.into(), message: message.into() }
    }

    /// Field name for validation rejections.
    pub fn field(&self) -> Option<&str> {
        match self {
            Rejection::Validation { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    /// Rule code for business rejections.
    pub fn code(&self) -> Option<&str> {
        match self {
            Rejection::Business { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Terminal failure recorded for one element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure<E> {
    /// Every attempt failed retryably; holds the last error seen.
    #[error("{0}")]
    Exhausted(E),
    /// The operation signalled a non-retryable condition.
    #[error("{0}")]
    Rejected(Rejection<E>),
    /// Stopped by the cancellation token.
    #[error("cancelled")]
    Cancelled,
}

impl<E> Failure<E> {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Failure::Exhausted(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Failure::Rejected(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Failure::Cancelled)
    }

    /// Borrow the rejection if this failure is one.
    pub fn as_rejection(&self) -> Option<&Rejection<E>> {
        match self {
            Failure::Rejected(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow the last retryable error if the budget was exhausted.
    pub fn as_exhausted(&self) -> Option<&E> {
        match self {
            Failure::Exhausted(e) => Some(e),
            _ => None,
        }
    }
}
