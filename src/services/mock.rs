//! Mock module source for scheduler and read-path tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::{ModuleSource, SummaryBatch, build_item, placeholder_item};
use crate::config::Instrument;
use crate::error::ProviderError;
use crate::models::{HistoryPoint, RangeKey, SparkPoint, SummaryMetrics};

/// Serves a constant value for every instrument, or fails on demand.
pub struct MockModuleSource {
    name: &'static str,
    value: f64,
    failing_summary: AtomicBool,
    failing_series: AtomicBool,
    summary_calls: AtomicUsize,
    series_calls: AtomicUsize,
}

impl MockModuleSource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            value: 1.0,
            failing_summary: AtomicBool::new(false),
            failing_series: AtomicBool::new(false),
            summary_calls: AtomicUsize::new(0),
            series_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Every instrument comes back as a placeholder with an error.
    pub fn failing_summary(self) -> Self {
        self.set_failing_summary(true);
        self
    }

    /// Every series request fails.
    pub fn failing_series(self) -> Self {
        self.failing_series.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_failing_summary(&self, failing: bool) {
        self.failing_summary.store(failing, Ordering::SeqCst);
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    pub fn series_calls(&self) -> usize {
        self.series_calls.load(Ordering::SeqCst)
    }

    fn history(&self) -> Vec<HistoryPoint> {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        vec![HistoryPoint::new(at, self.value)]
    }
}

#[async_trait]
impl ModuleSource for MockModuleSource {
    fn source_name(&self) -> &'static str {
        self.name
    }

    async fn fetch_summary(&self, instruments: &[Instrument]) -> SummaryBatch {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_summary.load(Ordering::SeqCst);

        let mut ordered = instruments.to_vec();
        ordered.sort_by_key(|item| item.sort_order);

        let mut batch = SummaryBatch::default();
        for instrument in &ordered {
            if failing {
                batch
                    .errors
                    .insert(instrument.ticker.clone(), "mock failure".to_string());
                batch.items.push(placeholder_item(instrument));
            } else {
                batch.items.push(build_item(
                    instrument,
                    self.value,
                    SummaryMetrics::default(),
                    &self.history(),
                ));
            }
        }
        batch
    }

    async fn fetch_series(
        &self,
        instrument: &Instrument,
        _range: RangeKey,
    ) -> Result<Vec<SparkPoint>, ProviderError> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_series.load(Ordering::SeqCst) {
            return Err(ProviderError::Server(format!("mock 503 for {}", instrument.ticker)));
        }
        Ok(self
            .history()
            .iter()
            .map(|p| SparkPoint {
                t: p.timestamp,
                v: p.value,
            })
            .collect())
    }
}
