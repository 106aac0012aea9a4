//! Observation-backed inflation summaries and series
//!
//! Raw index levels are turned into a year-over-year series before any
//! metric is computed.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{ModuleSource, SummaryBatch, build_item, last_two, placeholder_item, to_spark_points};
use crate::client::parallel::fetch_each;
use crate::client::{FRED_PROVIDER, ObservationApi, RateLimit, UpstreamGuard};
use crate::clock::Clock;
use crate::config::Instrument;
use crate::error::ProviderError;
use crate::metrics::{calculate_metrics_at, filter_by_range, to_yoy_points};
use crate::models::{HistoryPoint, RangeKey, SparkPoint};

pub struct InflationService {
    observations: Arc<dyn ObservationApi>,
    guard: UpstreamGuard,
    limit: RateLimit,
    clock: Arc<dyn Clock>,
    max_concurrent: usize,
}

impl InflationService {
    pub fn new(
        observations: Arc<dyn ObservationApi>,
        guard: UpstreamGuard,
        limit: RateLimit,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            observations,
            guard,
            limit,
            clock,
            max_concurrent: super::DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Year-over-year series for a series code; empty is `NoData`.
    async fn yoy_series(&self, series_id: &str) -> Result<Vec<HistoryPoint>, ProviderError> {
        let observations = &*self.observations;
        let raw = self
            .guard
            .call(FRED_PROVIDER, self.limit, series_id, || {
                observations.fetch_observations(series_id)
            })
            .await?;

        let yoy = to_yoy_points(&raw);
        if yoy.is_empty() {
            return Err(ProviderError::NoData(format!("{} (year-over-year)", series_id)));
        }
        Ok(yoy)
    }
}

#[async_trait]
impl ModuleSource for InflationService {
    fn source_name(&self) -> &'static str {
        "fred"
    }

    async fn fetch_summary(&self, instruments: &[Instrument]) -> SummaryBatch {
        let mut ordered = instruments.to_vec();
        ordered.sort_by_key(|item| item.sort_order);

        let results = fetch_each(
            ordered,
            |instrument: Instrument| async move { self.yoy_series(&instrument.ticker).await },
            self.max_concurrent,
        )
        .await;

        let now = self.clock.now();
        let mut batch = SummaryBatch::default();
        for (instrument, result) in results {
            let outcome = result.and_then(|yoy| {
                let (last, prev) =
                    last_two(&yoy).ok_or_else(|| ProviderError::NoData(instrument.ticker.clone()))?;
                let metrics = calculate_metrics_at(now, Some(last), prev, &yoy);
                Ok(build_item(&instrument, last, metrics, &yoy))
            });

            match outcome {
                Ok(item) => batch.items.push(item),
                Err(err) => {
                    debug!("Inflation summary failed for {}: {}", instrument.ticker, err);
                    batch.errors.insert(instrument.ticker.clone(), err.to_string());
                    batch.items.push(placeholder_item(&instrument));
                }
            }
        }
        batch
    }

    async fn fetch_series(
        &self,
        instrument: &Instrument,
        range: RangeKey,
    ) -> Result<Vec<SparkPoint>, ProviderError> {
        let yoy = self.yoy_series(&instrument.ticker).await?;
        let filtered = filter_by_range(&yoy, range);
        Ok(to_spark_points(&filtered, instrument.precision))
    }
}
