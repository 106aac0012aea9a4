//! Freshness and provider health snapshot

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheStats, DashboardCache};
use crate::client::{ProviderMonitor, ProviderStats};
use crate::clock::{serialize_local_opt, to_local};
use crate::models::Module;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub cache: CacheStats,
    pub is_stale: bool,
    #[serde(serialize_with = "serialize_local_opt")]
    pub last_update: Option<DateTime<Utc>>,
    /// Local RFC 3339 time of each module's last fresh summary
    pub last_success_by_module: BTreeMap<Module, Option<String>>,
    pub provider_stats: BTreeMap<String, ProviderStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl HealthReport {
    pub fn collect(cache: &DashboardCache, monitor: &ProviderMonitor) -> Self {
        let last_success_by_module = cache
            .module_last_success()
            .into_iter()
            .map(|(module, at)| (module, at.map(|t| to_local(t).to_rfc3339())))
            .collect();

        Self {
            status: "ok",
            cache: cache.stats(),
            is_stale: cache.is_globally_stale(),
            last_update: cache.last_update(),
            last_success_by_module,
            provider_stats: monitor.snapshot(),
            database: None,
        }
    }

    pub fn with_database(mut self, location: impl Into<String>) -> Self {
        self.database = Some(location.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePayload, CacheWrite, TtlCache};
    use crate::clock::{Clock, ManualClock};
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn test_health_before_and_after_fresh_write() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 7, 1, 6, 0, 0).unwrap(),
        ));
        let cache: DashboardCache = TtlCache::with_clock(60, 600, clock.clone());
        let monitor = ProviderMonitor::new(clock.clone());

        let empty = HealthReport::collect(&cache, &monitor);
        assert!(empty.is_stale);
        assert!(empty.last_update.is_none());
        assert!(empty.last_success_by_module.values().all(Option::is_none));

        monitor.record_attempt("yahoo");
        cache.set_with(
            "mag7_summary",
            CachePayload::Summary(Vec::new()),
            CacheWrite::at(clock.now()).module(Module::Mag7),
        );

        let report = HealthReport::collect(&cache, &monitor).with_database("/tmp/ekodash.db");
        assert!(!report.is_stale);
        assert_eq!(report.cache.entries, 1);
        assert_eq!(report.provider_stats["yahoo"].attempts, 1);
        assert_eq!(
            report.last_success_by_module[&Module::Mag7].as_deref(),
            Some("2026-07-01T08:00:00+02:00")
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["last_update"], "2026-07-01T08:00:00+02:00");
        assert_eq!(json["cache"]["ttl_seconds"], 60);
        assert!(json["last_success_by_module"]["commodities"].is_null());
        assert_eq!(json["database"], "/tmp/ekodash.db");
    }
}
