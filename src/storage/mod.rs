//! Persistence of refresh results
//!
//! The refresh tick writes through [`RefreshStore`]. Other processes read the
//! latest results back through [`SnapshotReader`], and job and provider
//! history through [`SqliteStore`].

pub mod sqlite;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task;

use crate::client::ProviderStats;
use crate::config::Instrument;
use crate::error::{Error, Result};
use crate::models::{JobRunOutcome, JobStatus, Module, RangeKey, SparkPoint, SummaryItem};

pub use sqlite::SqliteStore;

/// Database row ids keyed by instrument id.
pub type InstrumentIds = HashMap<String, i64>;

/// Side effects of a refresh tick.
///
/// Calls are synchronous; async callers go through [`run_blocking`]. None
/// is made while holding cache, limiter or monitor state.
pub trait RefreshStore: Send + Sync {
    /// Insert or update instrument identity; returns row ids.
    fn upsert_instruments(&self, instruments: &[Instrument]) -> Result<InstrumentIds>;

    /// Open a job run in `running` state; returns its row id.
    fn begin_job_run(&self, job_name: &str, started_at: DateTime<Utc>) -> Result<i64>;

    /// Append one snapshot row per item with a known instrument.
    fn store_summary_items(
        &self,
        ids: &InstrumentIds,
        items: &[SummaryItem],
        fetched_at: DateTime<Utc>,
    ) -> Result<usize>;

    /// Replace all points stored for (instrument, series type, range).
    fn replace_series_points(
        &self,
        instrument_id: i64,
        series_type: &str,
        range: RangeKey,
        points: &[SparkPoint],
        fetched_at: DateTime<Utc>,
    ) -> Result<()>;

    /// One row per provider.
    fn record_provider_stats(
        &self,
        stats: &BTreeMap<String, ProviderStats>,
        created_at: DateTime<Utc>,
    ) -> Result<()>;

    fn complete_job_run(&self, run_id: i64, outcome: &JobRunOutcome) -> Result<()>;
}

/// Latest persisted results, read outside the refresh tick.
pub trait SnapshotReader: Send + Sync {
    /// Newest snapshot of every instrument that has one.
    fn latest_snapshots(&self) -> Result<Vec<SnapshotRecord>>;

    /// Points stored for (instrument id, series type, range), oldest first.
    fn stored_series(
        &self,
        instrument_key: &str,
        series_type: &str,
        range: RangeKey,
    ) -> Result<Option<StoredSeries>>;

    /// Per module, the newest snapshot time that carried a real value.
    fn freshness_marks(&self) -> Result<BTreeMap<Module, DateTime<Utc>>>;
}

/// Run a synchronous store call on the blocking thread pool.
pub async fn run_blocking<S, T, F>(store: &Arc<S>, f: F) -> Result<T>
where
    S: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    task::spawn_blocking(move || f(&*store))
        .await
        .map_err(|e| Error::Other(format!("Store task failed: {}", e)))?
}

/// Newest quote snapshot of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub instrument_key: String,
    pub module: Module,
    pub fetched_at: DateTime<Utc>,
    pub observed_at: Option<DateTime<Utc>>,
    pub last: Option<f64>,
    pub day_abs: Option<f64>,
    pub day_pct: Option<f64>,
    pub w1_pct: Option<f64>,
    pub ytd_pct: Option<f64>,
    pub y1_pct: Option<f64>,
    pub is_stale: bool,
    pub sparkline: Vec<SparkPoint>,
}

impl SnapshotRecord {
    /// Summary item using display fields from the current configuration.
    pub fn to_item(&self, instrument: &Instrument) -> SummaryItem {
        SummaryItem {
            id: instrument.id.clone(),
            name: instrument.name.clone(),
            unit: instrument.unit_label.clone(),
            price_type: instrument.price_type.clone(),
            last: self.last,
            day_abs: self.day_abs,
            day_pct: self.day_pct,
            w1_pct: self.w1_pct,
            ytd_pct: self.ytd_pct,
            y1_pct: self.y1_pct,
            timestamp: self.observed_at,
            is_stale: self.is_stale,
            sparkline: self.sparkline.clone(),
        }
    }
}

/// Chart series as last written by a refresh tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSeries {
    pub points: Vec<SparkPoint>,
    pub fetched_at: DateTime<Utc>,
}

/// Job run as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRunRecord {
    pub id: i64,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub ok_count: i64,
    pub fail_count: i64,
    pub notes: Option<String>,
}

/// Provider counters captured at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderEventRecord {
    pub provider: String,
    pub event_type: String,
    pub attempts: i64,
    pub success: i64,
    pub fail: i64,
    pub retries: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}
