//! Retry policy: decides whether a failed attempt is worth another try.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::ApiError;

/// Default number of attempts per logical request, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Statuses retried by default.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 8] = [408, 409, 425, 429, 500, 502, 503, 504];

/// Retry settings for a client or a single request.
///
/// `max_attempts` counts every attempt including the first, so `3` means
/// one initial attempt plus up to two retries. `0` disables retrying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

/// Outcome of [`RetryOptions::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the given duration, then attempt again.
    Retry(Duration),
    /// Give up and surface the error.
    Stop,
}

impl RetryOptions {
    /// Policy that never retries: exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
            ..Self::default()
        }
    }

    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Upper bound on network calls for one logical request.
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Decides what to do after `attempt` (1-based) failed with `error`.
    pub fn evaluate(&self, attempt: u32, error: &ApiError) -> RetryDecision {
        if !self.is_enabled() || attempt >= self.max_attempts {
            return RetryDecision::Stop;
        }

        let retryable = match error.status() {
            Some(status) => self.retryable_status_codes.contains(&status),
            None => error.is_transport() && !error.is_cancelled(),
        };

        if retryable {
            RetryDecision::Retry(self.delay())
        } else {
            RetryDecision::Stop
        }
    }
}

/// Runs `operation` until it succeeds or `policy` says stop.
///
/// `operation` receives the 1-based attempt number. The error returned is
/// the one from the last attempt. A fired `cancel` token also interrupts the
/// wait between attempts.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: &RetryOptions,
    cancel: Option<&CancellationToken>,
    operation: F,
) -> Result<T, ApiError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let budget = policy.attempt_budget();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let delay = match policy.evaluate(attempt, &error) {
            RetryDecision::Stop => {
                debug!(
                    "{}: giving up after attempt {}/{}: {}",
                    operation_name, attempt, budget, error
                );
                return Err(error);
            }
            RetryDecision::Retry(delay) => delay,
        };

        warn!(
            "{}: attempt {}/{} failed ({}), retrying in {}ms...",
            operation_name,
            attempt,
            budget,
            error,
            delay.as_millis()
        );

        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ApiError::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            },
            None => tokio::time::sleep(delay).await,
        }
    }
}
