//! Per-provider sliding-window rate limiting
//!
//! Keeps an exact log of call timestamps per key inside the trailing window
//! (no fixed buckets). Calls over the limit are rejected, never delayed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::clock::{Clock, SystemClock};

/// Call budget for one upstream: at most `max_calls` per `period_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_calls: u32,
    pub period_seconds: u64,
}

impl RateLimit {
    pub const fn new(max_calls: u32, period_seconds: u64) -> Self {
        Self {
            max_calls,
            period_seconds,
        }
    }
}

/// Sliding-log rate limiter shared by all upstream calls.
pub struct SlidingWindowRateLimiter {
    events: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    clock: Arc<dyn Clock>,
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SlidingWindowRateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Lock the event log, recovering from poison.
    ///
    /// A poisoned log can at worst admit a call too many.
    fn lock_events(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.events.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Admit or reject one call for `key`.
    ///
    /// A zero budget or zero period disables limiting for the call.
    pub fn allow(&self, key: &str, max_calls: u32, period_seconds: u64) -> bool {
        if max_calls == 0 || period_seconds == 0 {
            return true;
        }

        let now = self.clock.now();
        let cutoff = now - Duration::seconds(period_seconds as i64);

        let mut events = self.lock_events();
        let queue = events.entry(key.to_string()).or_default();
        while queue.front().is_some_and(|ts| *ts <= cutoff) {
            queue.pop_front();
        }

        if queue.len() >= max_calls as usize {
            debug!(
                "Rate limiter: rejected call for '{}' ({} calls in last {}s)",
                key,
                queue.len(),
                period_seconds
            );
            return false;
        }

        queue.push_back(now);
        true
    }

    /// Admit or reject one call under a [`RateLimit`].
    pub fn allow_limit(&self, key: &str, limit: RateLimit) -> bool {
        self.allow(key, limit.max_calls, limit.period_seconds)
    }

    /// Calls currently recorded for `key` (after pruning).
    #[cfg(test)]
    pub fn in_window(&self, key: &str, period_seconds: u64) -> usize {
        let cutoff = self.clock.now() - Duration::seconds(period_seconds as i64);
        let mut events = self.lock_events();
        match events.get_mut(key) {
            Some(queue) => {
                while queue.front().is_some_and(|ts| *ts <= cutoff) {
                    queue.pop_front();
                }
                let len = queue.len();
                if len == 0 {
                    events.remove(key);
                }
                len
            }
            None => 0,
        }
    }
}
