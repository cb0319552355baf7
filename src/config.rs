//! Serializable retry policy description.
//!
//! Lets a policy live in a JSON document (or any serde format) next to the rest of an
//! application's settings. Every field is optional; missing fields take the defaults of
//! [`RetryPolicy::default`]: 3 attempts, fixed 1000 ms pause, no jitter.
//!
//! ```rust
//! use persevere::config::PolicyConfig;
//! use std::time::Duration;
//!
//! let policy = PolicyConfig::from_json(
//!     r#"{ "max_attempts": 3, "base_delay_ms": 100, "delay_multiplier": 2.0 }"#,
//! )
//! .unwrap()
//! .into_policy()
//! .unwrap();
//! assert_eq!(policy.delay_for(2), Duration::from_millis(200));
//! ```

use crate::retry::{BuildError, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::{Backoff, Jitter, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Jitter choice as spelled in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterKind {
    #[default]
    None,
    Full,
    Equal,
}

impl From<JitterKind> for Jitter {
    fn from(kind: JitterKind) -> Self {
        match kind {
            JitterKind::None => Jitter::None,
            JitterKind::Full => Jitter::Full,
            JitterKind::Equal => Jitter::Equal,
        }
    }
}

/// Backoff schedule as spelled in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// `base * delay_multiplier^(n-1)`.
    #[default]
    Geometric,
    /// `base * n`; `delay_multiplier` is ignored.
    Linear,
}

/// Plain-data form of a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub delay_multiplier: f64,
    pub schedule: ScheduleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    pub jitter: JitterKind,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            delay_multiplier: 1.0,
            schedule: ScheduleKind::Geometric,
            max_delay_ms: None,
            jitter: JitterKind::None,
        }
    }
}

/// Errors from reading a policy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid retry policy document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid retry policy: {0}")]
    Invalid(#[from] BuildError),
}

impl PolicyConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and build the policy.
    pub fn into_policy(self) -> Result<RetryPolicy, BuildError> {
        RetryPolicy::try_from(self)
    }
}

impl TryFrom<PolicyConfig> for RetryPolicy {
    type Error = BuildError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        let base = Duration::from_millis(config.base_delay_ms);
        let mut backoff = match config.schedule {
            ScheduleKind::Geometric => Backoff::geometric(base, config.delay_multiplier)?,
            ScheduleKind::Linear => Backoff::linear(base),
        };
        if let Some(max) = config.max_delay_ms {
            backoff = backoff.with_max(Duration::from_millis(max))?;
        }
        RetryPolicy::builder()
            .max_attempts(config.max_attempts)
            .backoff(backoff)
            .with_jitter(config.jitter.into())
            .build()
    }
}

impl From<&RetryPolicy> for PolicyConfig {
    fn from(policy: &RetryPolicy) -> Self {
        let backoff = policy.backoff();
        let (schedule, delay_multiplier) = match backoff.multiplier() {
            Some(multiplier) => (ScheduleKind::Geometric, multiplier),
            None => (ScheduleKind::Linear, 1.0),
        };
        Self {
            max_attempts: policy.max_attempts(),
            base_delay_ms: backoff.base().as_millis().try_into().unwrap_or(u64::MAX),
            delay_multiplier,
            schedule,
            max_delay_ms: backoff.max().map(|m| m.as_millis().try_into().unwrap_or(u64::MAX)),
            jitter: match policy.jitter() {
                Jitter::None => JitterKind::None,
                Jitter::Full => JitterKind::Full,
                Jitter::Equal => JitterKind::Equal,
            },
        }
    }
}
