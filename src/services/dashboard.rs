//! Read path: serve from cache, then from the last persisted refresh, and
//! fetch through the shared sources only when neither has the data

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::{ModuleSource, Sources, placeholder_item};
use crate::cache::{CachePayload, CacheWrite, DashboardCache, series_key, summary_key};
use crate::clock::serialize_local;
use crate::config::{Instrument, InstrumentSource, instruments::for_module};
use crate::error::{Error, ProviderError, Result};
use crate::models::{Module, RangeKey, SparkPoint, SummaryItem};
use crate::storage::{self, SnapshotReader, StoredSeries};

/// Why a response may be out of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    None,
    ProviderError,
    GlobalThreshold,
}

impl StaleReason {
    /// Global staleness wins over per-item staleness.
    pub fn for_items(items: &[SummaryItem], globally_stale: bool) -> Self {
        if globally_stale {
            StaleReason::GlobalThreshold
        } else if items.iter().any(|item| item.is_stale) {
            StaleReason::ProviderError
        } else {
            StaleReason::None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMeta {
    pub source: &'static str,
    pub cached: bool,
    #[serde(serialize_with = "serialize_local")]
    pub fetched_at: DateTime<Utc>,
    pub stale_reason: StaleReason,
    pub age_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub module: Module,
    pub items: Vec<SummaryItem>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesResponse {
    pub id: String,
    pub range: RangeKey,
    pub points: Vec<SparkPoint>,
    pub meta: ResponseMeta,
}

/// Presentation-facing reads over the shared cache.
pub struct DashboardService {
    cache: Arc<DashboardCache>,
    sources: Sources,
    instruments: Arc<dyn InstrumentSource>,
    store: Option<Arc<dyn SnapshotReader>>,
}

impl DashboardService {
    pub fn new(
        cache: Arc<DashboardCache>,
        sources: Sources,
        instruments: Arc<dyn InstrumentSource>,
    ) -> Self {
        Self {
            cache,
            sources,
            instruments,
            store: None,
        }
    }

    /// Fall back to persisted refresh results before fetching upstream.
    pub fn with_store(mut self, store: Arc<dyn SnapshotReader>) -> Self {
        self.store = Some(store);
        self
    }

    fn meta(
        &self,
        source: &dyn ModuleSource,
        cached: bool,
        fetched_at: DateTime<Utc>,
        reason: StaleReason,
    ) -> ResponseMeta {
        ResponseMeta {
            source: source.source_name(),
            cached,
            fetched_at,
            stale_reason: reason,
            age_seconds: (self.cache.now() - fetched_at).num_seconds().max(0),
        }
    }

    /// Summary for `module`, from cache when live.
    ///
    /// On a miss the newest persisted snapshots are served when any exist.
    /// Otherwise it fetches and writes with the same freshness rule as the
    /// refresh tick.
    pub async fn summary(&self, module: Module) -> Result<SummaryResponse> {
        let source = self.sources.for_module(module);
        let key = summary_key(module);

        let (items, fetched_at, cached) = match self.cache.get(&key) {
            Some(entry) => match entry.value {
                CachePayload::Summary(items) => (items, entry.fetched_at, true),
                CachePayload::Series(_) => {
                    return Err(Error::Other(format!("cache key '{}' holds a series", key)));
                }
            },
            None => {
                let instruments = for_module(&self.instruments.load()?, module);
                match self.stored_summary(module, &instruments).await {
                    Some((items, fetched_at)) => {
                        debug!("Cache miss for '{}', serving stored snapshots", key);
                        self.cache.set_with(
                            &key,
                            CachePayload::Summary(items.clone()),
                            CacheWrite::at(fetched_at)
                                .freshness_relevant(false)
                                .module(module),
                        );
                        (items, fetched_at, true)
                    }
                    None => {
                        debug!("Cache miss for '{}', fetching", key);
                        let batch = source.fetch_summary(&instruments).await;
                        let fetched_at = self.cache.now();
                        self.cache.set_with(
                            &key,
                            CachePayload::Summary(batch.items.clone()),
                            CacheWrite::at(fetched_at)
                                .freshness_relevant(batch.has_fresh_values())
                                .module(module),
                        );
                        (batch.items, fetched_at, false)
                    }
                }
            }
        };

        let globally_stale = self.cache.is_globally_stale();
        let items = normalize_items(items, globally_stale);
        let reason = StaleReason::for_items(&items, globally_stale);
        Ok(SummaryResponse {
            module,
            items,
            meta: self.meta(source.as_ref(), cached, fetched_at, reason),
        })
    }

    /// Chart series for one instrument: cache, then the persisted series,
    /// then upstream.
    ///
    /// Series writes never advance the freshness watermark.
    pub async fn series(
        &self,
        module: Module,
        id: &str,
        range: RangeKey,
    ) -> Result<SeriesResponse> {
        if !module.supports_range(range) {
            return Err(ProviderError::UnsupportedRange(format!("{} for {}", range, module)).into());
        }

        let source = self.sources.for_module(module);
        let key = series_key(module, id, range);

        let (points, fetched_at, cached) = match self.cache.get(&key) {
            Some(entry) => match entry.value {
                CachePayload::Series(points) => (points, entry.fetched_at, true),
                CachePayload::Summary(_) => {
                    return Err(Error::Other(format!("cache key '{}' holds a summary", key)));
                }
            },
            None => {
                let instrument = self.find_instrument(module, id)?;
                let (points, fetched_at, cached) =
                    match self.stored_series(module, &instrument.id, range).await {
                        Some(stored) => (stored.points, stored.fetched_at, true),
                        None => {
                            let points = source.fetch_series(&instrument, range).await?;
                            (points, self.cache.now(), false)
                        }
                    };
                self.cache.set_with(
                    &key,
                    CachePayload::Series(points.clone()),
                    CacheWrite::at(fetched_at)
                        .freshness_relevant(false)
                        .module(module),
                );
                (points, fetched_at, cached)
            }
        };

        let reason = if self.cache.is_globally_stale() {
            StaleReason::GlobalThreshold
        } else {
            StaleReason::None
        };
        Ok(SeriesResponse {
            id: id.to_string(),
            range,
            points,
            meta: self.meta(source.as_ref(), cached, fetched_at, reason),
        })
    }

    /// Newest persisted snapshots for the configured instruments of `module`.
    ///
    /// Also carries the persisted freshness marks into the cache. `None` when
    /// there is no store, no matching row, or the read failed.
    async fn stored_summary(
        &self,
        module: Module,
        instruments: &[Instrument],
    ) -> Option<(Vec<SummaryItem>, DateTime<Utc>)> {
        let store = self.store.as_ref()?;
        self.restore_freshness(store).await;

        let rows = match storage::run_blocking(store, |store| store.latest_snapshots()).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!("Stored snapshots unavailable for {}: {}", module, err);
                return None;
            }
        };

        let mut fetched_at: Option<DateTime<Utc>> = None;
        let mut items = Vec::with_capacity(instruments.len());
        for instrument in instruments {
            let row = rows
                .iter()
                .find(|row| row.module == module && row.instrument_key == instrument.id);
            match row {
                Some(row) => {
                    let newest = fetched_at.map_or(row.fetched_at, |prev| prev.max(row.fetched_at));
                    fetched_at = Some(newest);
                    items.push(row.to_item(instrument));
                }
                None => items.push(placeholder_item(instrument)),
            }
        }
        fetched_at.map(|fetched_at| (items, fetched_at))
    }

    async fn stored_series(
        &self,
        module: Module,
        id: &str,
        range: RangeKey,
    ) -> Option<StoredSeries> {
        let store = self.store.as_ref()?;
        self.restore_freshness(store).await;

        let id = id.to_string();
        let read = storage::run_blocking(store, move |store| {
            store.stored_series(&id, module.as_str(), range)
        })
        .await;
        match read {
            Ok(stored) => stored,
            Err(err) => {
                warn!("Stored series unavailable for {}: {}", module, err);
                None
            }
        }
    }

    /// Advance the cache watermark to the newest persisted refresh.
    async fn restore_freshness(&self, store: &Arc<dyn SnapshotReader>) {
        match storage::run_blocking(store, |store| store.freshness_marks()).await {
            Ok(marks) => {
                for (module, at) in marks {
                    self.cache.mark_fresh(module, at);
                }
            }
            Err(err) => warn!("Stored freshness unavailable: {}", err),
        }
    }

    fn find_instrument(&self, module: Module, id: &str) -> Result<Instrument> {
        for_module(&self.instruments.load()?, module)
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::NotFound(format!("Unknown {} id: {}", module, id)))
    }
}

/// Force every item stale when the whole system is stale.
pub fn normalize_items(items: Vec<SummaryItem>, force_stale: bool) -> Vec<SummaryItem> {
    items
        .into_iter()
        .map(|mut item| {
            item.is_stale = force_stale || item.is_stale;
            item
        })
        .collect()
}
