//! One refresh tick: fetch every module, write the cache, persist results

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, log_enabled, warn};

use super::RefreshJob;
use crate::cache::{CachePayload, CacheWrite, DashboardCache, series_key, summary_key};
use crate::client::ProviderMonitor;
use crate::clock::Clock;
use crate::config::{Instrument, InstrumentSource, instruments::for_module};
use crate::error::Result;
use crate::health::HealthReport;
use crate::models::job::CACHE_REFRESH_JOB;
use crate::models::{JobRun, JobRunOutcome, Module};
use crate::services::Sources;
use crate::storage::{self, InstrumentIds, RefreshStore};

/// Refresh job wired to the shared cache, sources and store.
pub struct Refresher {
    instruments: Arc<dyn InstrumentSource>,
    sources: Sources,
    cache: Arc<DashboardCache>,
    store: Arc<dyn RefreshStore>,
    monitor: Arc<ProviderMonitor>,
    clock: Arc<dyn Clock>,
}

impl Refresher {
    pub fn new(
        instruments: Arc<dyn InstrumentSource>,
        sources: Sources,
        cache: Arc<DashboardCache>,
        store: Arc<dyn RefreshStore>,
        monitor: Arc<ProviderMonitor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instruments,
            sources,
            cache,
            store,
            monitor,
            clock,
        }
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RefreshStore) -> Result<T> + Send + 'static,
    {
        storage::run_blocking(&self.store, move |store| f(store)).await
    }

    /// Run one tick.
    ///
    /// Per-item and per-series failures end up in the outcome counts. Only
    /// configuration and persistence errors are returned; once the job run
    /// row exists such an error still closes it as `failed`.
    pub async fn refresh_once(&self) -> Result<JobRunOutcome> {
        let instruments = Arc::new(self.instruments.load()?);
        let started_at = self.clock.now();

        info!(
            "scheduler.refresh.started job_name={} instrument_total={} commodities_count={} \
             mag7_count={} inflation_count={}",
            CACHE_REFRESH_JOB,
            instruments.len(),
            for_module(&instruments, Module::Commodities).len(),
            for_module(&instruments, Module::Mag7).len(),
            for_module(&instruments, Module::Inflation).len(),
        );

        let all = Arc::clone(&instruments);
        let ids = Arc::new(
            self.with_store(move |store| store.upsert_instruments(&all))
                .await?,
        );
        let run_id = self
            .with_store(move |store| store.begin_job_run(CACHE_REFRESH_JOB, started_at))
            .await?;
        let mut run = JobRun::begin(started_at);

        if let Err(err) = self.run_tick(&instruments, &ids, started_at, &mut run).await {
            let outcome = run.abort(self.clock.now(), &err.to_string());
            warn!(
                "scheduler.refresh.aborted job_name={} run_id={} error={}",
                CACHE_REFRESH_JOB, run_id, err
            );
            if let Err(finalize) = self
                .with_store(move |store| store.complete_job_run(run_id, &outcome))
                .await
            {
                warn!(
                    "scheduler.refresh.finalize_failed run_id={} error={}",
                    run_id, finalize
                );
            }
            return Err(err);
        }

        let outcome = run.finish(self.clock.now());
        let stored = outcome.clone();
        self.with_store(move |store| store.complete_job_run(run_id, &stored))
            .await?;

        info!(
            "scheduler.refresh.completed job_name={} status={} ok_count={} fail_count={} \
             duration_ms={}",
            outcome.job_name,
            outcome.status,
            outcome.ok_count,
            outcome.fail_count,
            outcome.duration_ms
        );
        if log_enabled!(log::Level::Debug) {
            let health = HealthReport::collect(&self.cache, &self.monitor);
            match serde_json::to_string(&health) {
                Ok(json) => debug!("scheduler.refresh.health {}", json),
                Err(err) => debug!("scheduler.refresh.health unavailable error={}", err),
            }
        }

        Ok(outcome)
    }

    /// Fetch, cache and persist every module; `run` collects the counts.
    async fn run_tick(
        &self,
        instruments: &[Instrument],
        ids: &Arc<InstrumentIds>,
        fetched_at: DateTime<Utc>,
        run: &mut JobRun,
    ) -> Result<()> {
        for module in Module::ALL {
            let group = for_module(instruments, module);
            let batch = self.sources.for_module(module).fetch_summary(&group).await;
            let fresh = batch.has_fresh_values();

            self.cache.set_with(
                &summary_key(module),
                CachePayload::Summary(batch.items.clone()),
                CacheWrite::at(fetched_at)
                    .freshness_relevant(fresh)
                    .module(module),
            );
            let (item_count, error_count) = (batch.items.len(), batch.errors.len());
            let ids = Arc::clone(ids);
            let items = batch.items;
            self.with_store(move |store| store.store_summary_items(&ids, &items, fetched_at))
                .await?;
            run.record_module(module, item_count, error_count);

            info!(
                "scheduler.refresh.module_summary module={} item_count={} error_count={} fresh={}",
                module, item_count, error_count, fresh
            );
        }

        for module in Module::ALL {
            let ranges = module.series_ranges();
            if ranges.is_empty() {
                continue;
            }
            let source = self.sources.for_module(module);

            for instrument in for_module(instruments, module) {
                for &range in ranges {
                    let points = match source.fetch_series(&instrument, range).await {
                        Ok(points) => points,
                        Err(err) => {
                            run.record_series_failure();
                            warn!(
                                "scheduler.refresh.series_failed module={} instrument_id={} \
                                 range_key={} error={}",
                                module, instrument.id, range, err
                            );
                            continue;
                        }
                    };

                    self.cache.set_with(
                        &series_key(module, &instrument.id, range),
                        CachePayload::Series(points.clone()),
                        CacheWrite::at(fetched_at)
                            .freshness_relevant(false)
                            .module(module),
                    );
                    if let Some(&instrument_id) = ids.get(&instrument.id) {
                        self.with_store(move |store| {
                            store.replace_series_points(
                                instrument_id,
                                module.as_str(),
                                range,
                                &points,
                                fetched_at,
                            )
                        })
                        .await?;
                    }
                }
            }
        }

        let stats = self.monitor.snapshot();
        let recorded_at = self.clock.now();
        self.with_store(move |store| store.record_provider_stats(&stats, recorded_at))
            .await
    }
}

#[async_trait]
impl RefreshJob for Refresher {
    async fn run_once(&self) -> Result<JobRunOutcome> {
        self.refresh_once().await
    }
}
