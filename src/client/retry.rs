//! Bounded exponential backoff with additive jitter
//!
//! The policy never touches provider counters itself; callers observe retries
//! through the `on_retry` callback.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ProviderError;

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry parameters plus the randomness and sleep used between attempts.
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    rng: Mutex<StdRng>,
}

impl RetryPolicy {
    /// `attempts` is clamped to at least one.
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            sleeper: Arc::new(TokioSleeper),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[cfg(test)]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Use a deterministic jitter sequence.
    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    #[cfg(test)]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay after failed attempt `attempt_index` (zero-based):
    /// `base * 2^index + uniform(0, base)`.
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let exponential = base * 2f64.powi(attempt_index as i32);
        let jitter = {
            let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
            rng.r#gen::<f64>() * base
        };
        Duration::from_secs_f64(exponential + jitter)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// `on_retry` fires once per extra try, before the backoff sleep.
    pub async fn run<T, F, Fut, R>(
        &self,
        key: &str,
        mut op: F,
        mut on_retry: R,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
        R: FnMut(u32, &ProviderError),
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if attempt + 1 >= self.attempts {
                        warn!(
                            "Upstream request for '{}' failed after {} attempts: {}",
                            key, self.attempts, err
                        );
                        return Err(ProviderError::Exhausted {
                            key: key.to_string(),
                            attempts: self.attempts,
                            last: Box::new(err),
                        });
                    }

                    on_retry(attempt, &err);
                    let delay = self.backoff_delay(attempt);
                    debug!(
                        "Retrying '{}' after attempt {} failed ({}); sleeping {:?}",
                        key,
                        attempt + 1,
                        err,
                        delay
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
pub use recording::RecordingSleeper;
