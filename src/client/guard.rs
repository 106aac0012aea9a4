//! Single entry point for upstream calls
//!
//! Ties the rate limiter, retry policy and provider monitor together so each
//! logical request is counted exactly once: one attempt, then one success or
//! one failure. Extra tries are counted as retries.

use std::future::Future;
use std::sync::Arc;

use log::warn;

use super::monitor::ProviderMonitor;
use super::rate_limit::{RateLimit, SlidingWindowRateLimiter};
use super::retry::RetryPolicy;
use crate::error::ProviderError;

/// Shared resilience state for all upstream providers.
#[derive(Clone)]
pub struct UpstreamGuard {
    limiter: Arc<SlidingWindowRateLimiter>,
    monitor: Arc<ProviderMonitor>,
    retry: Arc<RetryPolicy>,
}

impl UpstreamGuard {
    pub fn new(
        limiter: Arc<SlidingWindowRateLimiter>,
        monitor: Arc<ProviderMonitor>,
        retry: Arc<RetryPolicy>,
    ) -> Self {
        Self {
            limiter,
            monitor,
            retry,
        }
    }

    pub fn monitor(&self) -> &Arc<ProviderMonitor> {
        &self.monitor
    }

    /// Run one logical request against `provider`.
    ///
    /// `key` names the item (ticker or series code) for log and error text.
    /// No lock is held while `op` runs.
    pub async fn call<T, F, Fut>(
        &self,
        provider: &str,
        limit: RateLimit,
        key: &str,
        op: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.monitor.record_attempt(provider);

        if !self.limiter.allow_limit(provider, limit) {
            let err = ProviderError::RateLimited {
                provider: provider.to_string(),
            };
            warn!("Skipping '{}': {}", key, err);
            self.monitor.record_failure(provider, err.to_string());
            return Err(err);
        }

        let monitor = Arc::clone(&self.monitor);
        let result = self
            .retry
            .run(key, op, |_, _| monitor.record_retry(provider))
            .await;

        match result {
            Ok(value) => {
                self.monitor.record_success(provider);
                Ok(value)
            }
            Err(err) => {
                self.monitor.record_failure(provider, err.to_string());
                Err(err)
            }
        }
    }
}
