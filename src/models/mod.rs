//! Domain models shared by the cache, services, scheduler and CLI
//!
//! Display models for table/JSON output live in [`display`].

pub mod display;
pub mod job;
pub mod market;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use job::{JobRun, JobRunOutcome, JobStatus};
pub use market::{HistoryPoint, SparkPoint, SummaryItem, SummaryMetrics};

/// Instrument groups refreshed together and tracked for freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Commodities,
    Mag7,
    Inflation,
}

impl Module {
    /// All known modules, in refresh order.
    pub const ALL: [Module; 3] = [Module::Commodities, Module::Mag7, Module::Inflation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Commodities => "commodities",
            Module::Mag7 => "mag7",
            Module::Inflation => "inflation",
        }
    }

    /// Ranges the refresh tick pre-fetches series for.
    ///
    /// `mag7` is summary-only.
    pub fn series_ranges(&self) -> &'static [RangeKey] {
        match self {
            Module::Commodities => &[RangeKey::OneMonth, RangeKey::ThreeMonths, RangeKey::OneYear],
            Module::Mag7 => &[],
            Module::Inflation => &[
                RangeKey::OneMonth,
                RangeKey::ThreeMonths,
                RangeKey::SixMonths,
                RangeKey::OneYear,
            ],
        }
    }

    pub fn supports_range(&self, range: RangeKey) -> bool {
        self.series_ranges().contains(&range)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commodities" => Ok(Module::Commodities),
            "mag7" => Ok(Module::Mag7),
            "inflation" => Ok(Module::Inflation),
            other => Err(format!(
                "unknown module '{}' (expected commodities, mag7 or inflation)",
                other
            )),
        }
    }
}

/// Time range for a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeKey {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl RangeKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeKey::OneMonth => "1m",
            RangeKey::ThreeMonths => "3m",
            RangeKey::SixMonths => "6m",
            RangeKey::OneYear => "1y",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            RangeKey::OneMonth => 1,
            RangeKey::ThreeMonths => 3,
            RangeKey::SixMonths => 6,
            RangeKey::OneYear => 12,
        }
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(RangeKey::OneMonth),
            "3m" => Ok(RangeKey::ThreeMonths),
            "6m" => Ok(RangeKey::SixMonths),
            "1y" => Ok(RangeKey::OneYear),
            other => Err(format!("unknown range '{}' (expected 1m, 3m, 6m or 1y)", other)),
        }
    }
}
