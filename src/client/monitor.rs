//! Per-provider call counters and last error

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

/// Counters for one upstream provider.
///
/// Counters only grow until [`ProviderMonitor::clear`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub attempts: u64,
    pub success: u64,
    pub fail: u64,
    pub retries: u64,
    pub last_error: Option<String>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Thread-safe aggregator keyed by provider name.
///
/// Providers are created lazily on first touch.
pub struct ProviderMonitor {
    stats: Mutex<BTreeMap<String, ProviderStats>>,
    clock: Arc<dyn Clock>,
}

impl Default for ProviderMonitor {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ProviderMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            stats: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    fn lock_stats(&self) -> MutexGuard<'_, BTreeMap<String, ProviderStats>> {
        self.stats.lock().unwrap_or_else(|poisoned| {
            warn!("Provider monitor mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn update<F: FnOnce(&mut ProviderStats)>(&self, provider: &str, f: F) {
        let mut stats = self.lock_stats();
        f(stats.entry(provider.to_string()).or_default());
    }

    pub fn record_attempt(&self, provider: &str) {
        self.update(provider, |row| row.attempts += 1);
    }

    pub fn record_success(&self, provider: &str) {
        self.update(provider, |row| row.success += 1);
    }

    pub fn record_failure(&self, provider: &str, error: impl Into<String>) {
        let error = error.into();
        let now = self.clock.now();
        self.update(provider, |row| {
            row.fail += 1;
            row.last_error = Some(error);
            row.last_failure_at = Some(now);
        });
    }

    pub fn record_retry(&self, provider: &str) {
        self.update(provider, |row| row.retries += 1);
    }

    /// Deep copy of all provider counters.
    pub fn snapshot(&self) -> BTreeMap<String, ProviderStats> {
        self.lock_stats().clone()
    }

    pub fn clear(&self) {
        self.lock_stats().clear();
    }
}
