//! Retry with exponential backoff for operations that fail transiently,
//! such as conditional writes that lose a version race.

use crate::error::AppError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Retry policy: attempt count and backoff shape.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the initial call).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff delay.
    pub max_backoff: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_multiplier: f64,
    /// Whether to add random jitter to backoff delays.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// No retries: fail on the first error.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Short delays for latency-sensitive paths and tests.
    pub fn quick() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Backoff before retry number `attempt` (zero-based).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64;
        let multiplied = base_ms * self.backoff_multiplier.powi(attempt as i32);
        let capped = multiplied.min(self.max_backoff.as_millis() as f64);

        let final_ms = if self.add_jitter {
            // Up to 25% jitter so synchronized clients do not retry in lockstep
            let jitter = capped * 0.25 * rand_jitter();
            capped + jitter
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }
}

/// Jitter in [0, 1) derived from the system clock.
fn rand_jitter() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Errors worth retrying: the next attempt may see a different outcome.
pub fn is_retryable(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Conflict(_) | AppError::ServiceUnavailable | AppError::DatabaseError(_)
    )
}

/// Errors that no amount of retrying will fix.
pub fn is_permanent_failure(error: &AppError) -> bool {
    matches!(
        error,
        AppError::ValidationError(_) | AppError::BadRequest(_) | AppError::NotFound(_)
    )
}

/// Run `f`, retrying per `config` while it returns retryable errors.
///
/// The closure is re-invoked from scratch on every attempt, so it must
/// re-read whatever state it depends on rather than capture stale values.
pub async fn retry_operation<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    f: F,
) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(error) => {
                if attempt >= config.max_retries {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %error,
                        "Operation failed, retries exhausted"
                    );
                    return Err(error);
                }

                if is_permanent_failure(&error) {
                    warn!(
                        operation = operation_name,
                        error = %error,
                        "Operation failed permanently, not retrying"
                    );
                    return Err(error);
                }

                if !is_retryable(&error) {
                    warn!(
                        operation = operation_name,
                        error = %error,
                        "Operation failed with non-retryable error"
                    );
                    return Err(error);
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %error,
                    "Operation failed, retrying after backoff"
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
