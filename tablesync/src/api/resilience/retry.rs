//! Retry policy with exponential backoff and per-attempt timeouts

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::api::ApiError;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Randomize each delay by ±25%
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Fewer attempts, longer waits
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Executes gateway calls under a timeout, retrying retryable failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before retry number `retry` (1 = first retry)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let base_ms = self.config.base_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let delay_ms = if self.config.jitter {
            let factor: f64 = rand::rng().random_range(0.75..=1.25);
            capped_ms * factor
        } else {
            capped_ms
        };

        Duration::from_millis(delay_ms.max(0.0).round() as u64)
    }

    /// Run `operation` once under `timeout`, mapping elapsed time to a transport error
    pub async fn run_once<T, Fut>(
        &self,
        operation_name: &str,
        timeout: Duration,
        operation: Fut,
    ) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match tokio::time::timeout(timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::transport(format!(
                "{} timed out after {:?}",
                operation_name, timeout
            ))),
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts
    pub async fn execute<T, F, Fut>(
        &self,
        operation_name: &str,
        timeout: Duration,
        mut operation: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match self.run_once(operation_name, timeout, operation()).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                if attempt > 1 {
                    debug!(
                        "{} giving up after {} attempt(s): {}",
                        operation_name, attempt, error
                    );
                }
                return Err(error);
            }

            let delay = self.delay_for_retry(attempt);
            warn!(
                "{} failed (attempt {}/{}): {} - retrying in {:?}",
                operation_name, attempt, max_attempts, error, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
