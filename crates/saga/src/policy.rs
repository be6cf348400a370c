//! Outbound call policy: per-attempt timeout with bounded fixed-backoff retries.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::error::RemoteCallError;

/// Bounds on one logical call to the resource owner.
///
/// # Default Values
///
/// - `timeout`: 3 seconds per attempt
/// - `max_retries`: 3 (so at most 4 attempts)
/// - `backoff`: 300ms between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_retries: usize,
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            max_retries: 3,
            backoff: Duration::from_millis(300),
        }
    }
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_retries: usize, backoff: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            backoff,
        }
    }

    /// Longest one logical call can take: every attempt timing out, with a
    /// backoff pause between attempts.
    pub fn call_budget(&self) -> Duration {
        let attempts = u32::try_from(self.max_retries.saturating_add(1)).unwrap_or(u32::MAX);
        self.timeout
            .saturating_mul(attempts)
            .saturating_add(self.backoff.saturating_mul(attempts - 1))
    }

    /// Longest a booking saga's remote calls can take: hold, confirm and
    /// the compensating release each using their full budget.
    pub fn saga_budget(&self) -> Duration {
        self.call_budget().saturating_mul(3)
    }
}

/// Runs `operation` under `policy`.
///
/// Each attempt is cut off after `policy.timeout`. Retryable failures
/// (transport, timeout) are retried up to `policy.max_retries` times with a
/// fixed `policy.backoff` pause; anything else is returned immediately.
pub async fn call_with_policy<F, Fut, T>(
    policy: &CallPolicy,
    step: &'static str,
    mut operation: F,
) -> Result<T, RemoteCallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteCallError>>,
{
    let mut attempt = 0;

    loop {
        let result = match timeout(policy.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteCallError::Timeout(policy.timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(step, attempt, "call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                tracing::warn!(
                    step,
                    attempt,
                    delay_ms = policy.backoff.as_millis() as u64,
                    error = %err,
                    "call failed, retrying"
                );
                metrics::counter!("resource_owner_call_retries_total", "step" => step)
                    .increment(1);
                sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    tracing::error!(step, attempt, error = %err, "call failed after max retries");
                }
                return Err(err);
            }
        }
    }
}
