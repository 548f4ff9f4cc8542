//! Retry with linear backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AbacusError;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; retry `n` waits `n` times this.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(retry)))
    }

    /// Execute an async operation with retry.
    ///
    /// The operation receives the 1-based attempt number. Only errors for
    /// which [`AbacusError::is_retryable`] holds are retried.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, AbacusError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AbacusError>>,
    {
        let mut retry = 0;
        loop {
            match operation(retry + 1).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if retry >= self.max_retries => {
                    tracing::error!(
                        attempts = retry + 1,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    tracing::warn!(
                        retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
