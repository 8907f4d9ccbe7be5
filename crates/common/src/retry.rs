//! Exponential backoff retry used when connecting to infrastructure.

use std::future::Future;
use std::time::Duration;

/// How often and how patiently an operation is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts. `None` retries until success.
    pub max_attempts: Option<u32>,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for the delay between attempts.
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(3),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Retries forever with a fixed delay between attempts.
    pub fn forever(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Retries up to `max_attempts` times with exponential backoff.
    pub fn bounded(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            initial_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// Returns the delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Runs `operation` until it succeeds or the policy gives up.
///
/// The closure receives the 1-based attempt number. On exhaustion the last
/// error is returned.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(%label, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if policy.exhausted(attempt) {
                    tracing::error!(%label, attempt, %error, "operation failed after all retries");
                    return Err(error);
                }

                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    %label,
                    attempt,
                    %error,
                    delay_ms = delay.as_millis() as u64,
                    "operation failed, retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
