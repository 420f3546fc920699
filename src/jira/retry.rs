//! Exponential backoff retry for Jira requests.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

use crate::error::JiraError;

/// Default: 3 total attempts, base 1s, max 30s.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
            max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Retry an async Jira call with exponential backoff.
///
/// Only transient errors (see [`JiraError::is_transient`]) are retried;
/// anything else is returned as is. When every attempt fails the last
/// error is wrapped in [`JiraError::RetriesExhausted`].
pub async fn retry_with_backoff<T, Fut, F>(policy: &RetryPolicy, mut attempt: F) -> Result<T, JiraError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JiraError>>,
{
    let mut backoff = policy.backoff();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let error = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };

        if attempts >= policy.max_attempts {
            return Err(JiraError::RetriesExhausted(Box::new(error)));
        }

        warn!(
            "Jira request failed (attempt {}/{}): {}",
            attempts, policy.max_attempts, error
        );
        if let Some(wait_duration) = backoff.next_backoff() {
            tokio::time::sleep(wait_duration).await;
        }
    }
}
