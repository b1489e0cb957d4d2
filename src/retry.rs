use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{ClientError, Result};
use crate::metrics::RETRIES_TOTAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

// How a retried call ended
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success {
        value: T,
        attempts: u32,
    },
    Failed {
        error: ClientError,
        attempts: u32,
        // true when the error was retryable but we ran out of attempts
        exhausted: bool,
    },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Failed { error, .. } => Err(error),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Run `attempt_fn` (given the 1-based attempt number) until it succeeds,
    /// fails terminally, or `max_attempts` is used up.
    pub async fn execute<T, F, Fut>(&self, mut attempt_fn: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match attempt_fn(attempt).await {
                Ok(value) => {
                    return RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            let Some(wait) = error.retry_delay(attempt, self.base_delay) else {
                return RetryOutcome::Failed {
                    error,
                    attempts: attempt,
                    exhausted: false,
                };
            };

            if attempt >= max_attempts {
                return RetryOutcome::Failed {
                    error,
                    attempts: attempt,
                    exhausted: true,
                };
            }

            warn!(
                attempt,
                max_attempts,
                code = %error.code(),
                wait_ms = wait.as_millis() as u64,
                "retrying request"
            );
            RETRIES_TOTAL.inc();
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
