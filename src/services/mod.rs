//! Data services: upstream histories turned into summaries and chart series
//!
//! Both the refresh scheduler and the read path go through [`ModuleSource`],
//! so they share one fetch path and one freshness rule.

pub mod dashboard;
pub mod inflation;
pub mod market;
#[cfg(test)]
pub mod mock;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Instrument;
use crate::error::ProviderError;
use crate::metrics::{round_opt, round_to};
use crate::models::{HistoryPoint, Module, RangeKey, SparkPoint, SummaryItem, SummaryMetrics};

pub use dashboard::{DashboardService, ResponseMeta, StaleReason};
pub use inflation::InflationService;
pub use market::MarketDataService;

/// Upstream requests in flight per summary fetch.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Points kept in a summary sparkline.
pub const SPARKLINE_POINTS: usize = 30;

/// Decimals for percentage metrics.
const PERCENT_PRECISION: u32 = 2;

/// Summary items for a module plus per-ticker error messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryBatch {
    pub items: Vec<SummaryItem>,
    /// Error text keyed by ticker or series code
    pub errors: BTreeMap<String, String>,
}

impl SummaryBatch {
    /// A write of this batch may advance the global freshness watermark.
    pub fn has_fresh_values(&self) -> bool {
        self.items.iter().any(SummaryItem::has_value)
    }
}

/// Fetch capability for one family of modules.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Label reported to readers, e.g. `yahoo_finance`
    fn source_name(&self) -> &'static str;

    /// Summary items in `sort_order`; never fails as a whole.
    async fn fetch_summary(&self, instruments: &[Instrument]) -> SummaryBatch;

    /// Rounded chart points for one instrument and range.
    async fn fetch_series(
        &self,
        instrument: &Instrument,
        range: RangeKey,
    ) -> Result<Vec<SparkPoint>, ProviderError>;
}

/// Module to source routing.
#[derive(Clone)]
pub struct Sources {
    pub market: Arc<dyn ModuleSource>,
    pub inflation: Arc<dyn ModuleSource>,
}

impl Sources {
    pub fn new(market: Arc<dyn ModuleSource>, inflation: Arc<dyn ModuleSource>) -> Self {
        Self { market, inflation }
    }

    pub fn for_module(&self, module: Module) -> &Arc<dyn ModuleSource> {
        match module {
            Module::Commodities | Module::Mag7 => &self.market,
            Module::Inflation => &self.inflation,
        }
    }
}

/// Item standing in for an instrument whose fetch failed.
pub fn placeholder_item(instrument: &Instrument) -> SummaryItem {
    SummaryItem {
        id: instrument.id.clone(),
        name: instrument.name.clone(),
        unit: instrument.unit_label.clone(),
        price_type: instrument.price_type.clone(),
        last: None,
        day_abs: None,
        day_pct: None,
        w1_pct: None,
        ytd_pct: None,
        y1_pct: None,
        timestamp: None,
        is_stale: true,
        sparkline: Vec::new(),
    }
}

/// Item built from a successful fetch.
///
/// `history` is the series the metrics were computed over; its last point
/// supplies the timestamp.
pub(crate) fn build_item(
    instrument: &Instrument,
    last: f64,
    metrics: SummaryMetrics,
    history: &[HistoryPoint],
) -> SummaryItem {
    let precision = instrument.precision;
    SummaryItem {
        id: instrument.id.clone(),
        name: instrument.name.clone(),
        unit: instrument.unit_label.clone(),
        price_type: instrument.price_type.clone(),
        last: Some(round_to(last, precision)),
        day_abs: round_opt(metrics.day_abs, precision),
        day_pct: round_opt(metrics.day_pct, PERCENT_PRECISION),
        w1_pct: round_opt(metrics.week_pct, PERCENT_PRECISION),
        ytd_pct: round_opt(metrics.ytd_pct, PERCENT_PRECISION),
        y1_pct: round_opt(metrics.year_pct, PERCENT_PRECISION),
        timestamp: history.last().map(|p| p.timestamp),
        is_stale: false,
        sparkline: to_spark_points(tail(history, SPARKLINE_POINTS), precision),
    }
}

pub(crate) fn to_spark_points(points: &[HistoryPoint], precision: u32) -> Vec<SparkPoint> {
    points
        .iter()
        .map(|p| SparkPoint {
            t: p.timestamp,
            v: round_to(p.value, precision),
        })
        .collect()
}

fn tail(points: &[HistoryPoint], n: usize) -> &[HistoryPoint] {
    &points[points.len().saturating_sub(n)..]
}

/// Latest value and the one before it.
pub(crate) fn last_two(points: &[HistoryPoint]) -> Option<(f64, Option<f64>)> {
    let (last, rest) = points.split_last()?;
    Some((last.value, rest.last().map(|p| p.value)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, Utc};

    use crate::config::Instrument;
    use crate::models::{HistoryPoint, Module};

    pub fn instrument(id: &str, ticker: &str, module: Module, sort_order: i32) -> Instrument {
        Instrument {
            id: id.to_string(),
            name: id.to_uppercase(),
            ticker: ticker.to_string(),
            unit_label: Some("USD".to_string()),
            price_type: None,
            badge_symbol: None,
            precision: 2,
            display_group: None,
            sort_order,
            module,
        }
    }

    /// `days` daily points ending at `end`, rising by one per day from `start`.
    pub fn daily(end: DateTime<Utc>, days: i64, start: f64) -> Vec<HistoryPoint> {
        (0..days)
            .map(|i| HistoryPoint::new(end - Duration::days(days - 1 - i), start + i as f64))
            .collect()
    }
}
