//! Retry policy for page fetches
//!
//! The sync loop never retries on its own. Whether a failed fetch is repeated
//! is decided here, from configuration; the default of one attempt keeps the
//! historical fail-fast behaviour.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::FetchError;

/// Inclusive HTTP status range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRange {
    pub min: u16,
    pub max: u16,
}

impl StatusRange {
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, status: u16) -> bool {
        (self.min..=self.max).contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per page, the first one included
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub retry_on_connection_failure: bool,
    pub retry_on_statuses: Vec<StatusRange>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            retry_on_connection_failure: true,
            retry_on_statuses: vec![StatusRange::new(429, 429), StatusRange::new(500, 599)],
        }
    }
}

impl RetryPolicy {
    /// Whether `error` qualifies for another attempt, ignoring the attempt budget.
    pub fn is_retryable(&self, error: &FetchError) -> bool {
        match error {
            FetchError::ConnectionFailed { .. } => self.retry_on_connection_failure,
            FetchError::ServerError { status } => {
                self.retry_on_statuses.iter().any(|range| range.contains(*status))
            }
            FetchError::InvalidBody { .. } => false,
        }
    }

    /// Whether attempt number `attempt` (1-based) that failed with `error` should be followed by another.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        attempt < self.max_attempts && self.is_retryable(error)
    }

    /// Backoff before the attempt that follows attempt number `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let raw = self.base_delay_ms as f64 * self.backoff_multiplier.max(1.0).powi(exponent);
        #[allow(clippy::cast_precision_loss)]
        let capped = raw.min(self.max_delay_ms as f64);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let millis = capped as u64;
        Duration::from_millis(millis)
    }
}
