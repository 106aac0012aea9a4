//! Price/value history and summary types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of a price or index level.
///
/// Sequences of points are kept ordered by timestamp ascending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl HistoryPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Chart point with a value already rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparkPoint {
    pub t: DateTime<Utc>,
    pub v: f64,
}

/// Derived comparison metrics; each one is independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub day_abs: Option<f64>,
    pub day_pct: Option<f64>,
    pub week_pct: Option<f64>,
    pub ytd_pct: Option<f64>,
    pub year_pct: Option<f64>,
}

/// Summary row for one instrument as cached and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
    pub last: Option<f64>,
    pub day_abs: Option<f64>,
    pub day_pct: Option<f64>,
    pub w1_pct: Option<f64>,
    pub ytd_pct: Option<f64>,
    pub y1_pct: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub is_stale: bool,
    #[serde(default)]
    pub sparkline: Vec<SparkPoint>,
}

impl SummaryItem {
    /// Whether the item carries a real primary value.
    pub fn has_value(&self) -> bool {
        self.last.is_some()
    }
}
