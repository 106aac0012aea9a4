//! In-memory TTL cache with a global freshness watermark
//!
//! Entry expiry and global staleness are independent: entries expire after
//! `ttl_seconds`, while staleness depends only on how long ago the last
//! freshness-relevant write happened.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::clock::Clock;
use crate::models::Module;

/// Immutable cached value with its fetch and expiry times.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Write options for [`TtlCache::set_with`].
#[derive(Debug, Clone, Copy)]
pub struct CacheWrite {
    /// Defaults to the cache clock's current time
    pub fetched_at: Option<DateTime<Utc>>,
    pub freshness_relevant: bool,
    pub module: Option<Module>,
}

impl Default for CacheWrite {
    fn default() -> Self {
        Self {
            fetched_at: None,
            freshness_relevant: true,
            module: None,
        }
    }
}

impl CacheWrite {
    pub fn at(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at: Some(fetched_at),
            ..Self::default()
        }
    }

    pub fn freshness_relevant(mut self, relevant: bool) -> Self {
        self.freshness_relevant = relevant;
        self
    }

    pub fn module(mut self, module: Module) -> Self {
        self.module = Some(module);
        self
    }
}

/// Counters reported by [`TtlCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub ttl_seconds: u64,
    pub stale_threshold_seconds: u64,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    last_update: Option<DateTime<Utc>>,
    module_success: BTreeMap<Module, Option<DateTime<Utc>>>,
}

impl<V> CacheState<V> {
    fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            last_update: None,
            module_success: Module::ALL.iter().map(|m| (*m, None)).collect(),
        }
    }

    fn advance(&mut self, fetched_at: DateTime<Utc>, module: Option<Module>) {
        self.last_update = Some(self.last_update.map_or(fetched_at, |prev| prev.max(fetched_at)));
        if let Some(module) = module {
            let slot = self.module_success.entry(module).or_insert(None);
            *slot = Some(slot.map_or(fetched_at, |prev| prev.max(fetched_at)));
        }
    }
}

/// Concurrency-safe key/value store with per-entry expiry.
///
/// Every operation takes one short lock; nothing is held across an await.
pub struct TtlCache<V> {
    state: Mutex<CacheState<V>>,
    ttl_seconds: u64,
    stale_threshold_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn with_clock(
        ttl_seconds: u64,
        stale_threshold_seconds: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(CacheState::empty()),
            ttl_seconds,
            stale_threshold_seconds,
            clock,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Live entry for `key`; an expired entry is evicted and `None` returned.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now();
        let mut state = self.lock_state();
        match state.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.clone()),
            Some(_) => {
                debug!("Cache entry '{}' expired, evicting", key);
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` fetched now, marked freshness-relevant.
    #[cfg(test)]
    pub fn set(&self, key: &str, value: V) -> CacheEntry<V> {
        self.set_with(key, value, CacheWrite::default())
    }

    /// Store `value`, replacing any previous entry under `key`.
    ///
    /// A freshness-relevant write moves `last_update` (and the module's last
    /// success when tagged) to `fetched_at`; neither ever moves backwards.
    pub fn set_with(&self, key: &str, value: V, write: CacheWrite) -> CacheEntry<V> {
        let fetched_at = write.fetched_at.unwrap_or_else(|| self.clock.now());
        let entry = CacheEntry {
            value,
            fetched_at,
            expires_at: fetched_at + Duration::seconds(self.ttl_seconds as i64),
        };

        let mut state = self.lock_state();
        state.entries.insert(key.to_string(), entry.clone());

        if write.freshness_relevant {
            state.advance(fetched_at, write.module);
        }

        entry
    }

    /// Record a freshness-relevant write made elsewhere, e.g. by an earlier
    /// process, without storing an entry.
    pub fn mark_fresh(&self, module: Module, fetched_at: DateTime<Utc>) {
        self.lock_state().advance(fetched_at, Some(module));
    }

    /// Purge expired entries, then report counts.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut state = self.lock_state();
        state.entries.retain(|_, entry| entry.expires_at > now);
        CacheStats {
            entries: state.entries.len(),
            ttl_seconds: self.ttl_seconds,
            stale_threshold_seconds: self.stale_threshold_seconds,
        }
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.lock_state().last_update
    }

    /// Last freshness-relevant write per known module.
    pub fn module_last_success(&self) -> BTreeMap<Module, Option<DateTime<Utc>>> {
        self.lock_state().module_success.clone()
    }

    /// True before any freshness-relevant write, or once the last one is
    /// older than the stale threshold.
    pub fn is_globally_stale(&self) -> bool {
        let now = self.clock.now();
        match self.lock_state().last_update {
            None => true,
            Some(last) => now - last > Duration::seconds(self.stale_threshold_seconds as i64),
        }
    }

    /// Drop all entries, the watermark and module timestamps.
    pub fn clear(&self) {
        *self.lock_state() = CacheState::empty();
    }
}
