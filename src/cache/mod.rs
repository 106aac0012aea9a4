//! Process-wide cache for summaries and chart series
//!
//! One [`TtlCache`] instance is shared by the refresh scheduler (writer) and
//! the read path. Global freshness is tracked alongside entry expiry.

pub mod key;
pub mod ttl;

use serde::Serialize;

use crate::models::{SparkPoint, SummaryItem};

pub use key::{series_key, summary_key};
pub use ttl::{CacheStats, CacheWrite, TtlCache};

/// Values stored in the dashboard cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CachePayload {
    Summary(Vec<SummaryItem>),
    Series(Vec<SparkPoint>),
}

#[cfg(test)]
impl CachePayload {
    pub fn as_summary(&self) -> Option<&[SummaryItem]> {
        match self {
            CachePayload::Summary(items) => Some(items),
            CachePayload::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[SparkPoint]> {
        match self {
            CachePayload::Series(points) => Some(points),
            CachePayload::Summary(_) => None,
        }
    }
}

/// The cache shared across the process.
pub type DashboardCache = TtlCache<CachePayload>;
