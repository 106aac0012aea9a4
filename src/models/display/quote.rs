//! Summary and series rows

use serde::Serialize;
use tabled::Tabled;

use crate::models::{SparkPoint, SummaryItem};
use crate::output::formatters::{format_pct, format_time, format_value};

const VALUE_DECIMALS: usize = 2;

/// One instrument of a module summary.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct SummaryDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "LAST")]
    pub last: String,

    #[tabled(rename = "UNIT")]
    pub unit: String,

    #[tabled(rename = "DAY")]
    pub day_abs: String,

    #[tabled(rename = "DAY %")]
    pub day_pct: String,

    #[tabled(rename = "1W %")]
    pub w1_pct: String,

    #[tabled(rename = "YTD %")]
    pub ytd_pct: String,

    #[tabled(rename = "1Y %")]
    pub y1_pct: String,

    #[tabled(rename = "AS OF")]
    pub as_of: String,

    #[tabled(rename = "STALE")]
    pub stale: String,
}

impl From<&SummaryItem> for SummaryDisplay {
    fn from(item: &SummaryItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            last: format_value(item.last, VALUE_DECIMALS),
            unit: item.unit.clone().unwrap_or_default(),
            day_abs: format_value(item.day_abs, VALUE_DECIMALS),
            day_pct: format_pct(item.day_pct),
            w1_pct: format_pct(item.w1_pct),
            ytd_pct: format_pct(item.ytd_pct),
            y1_pct: format_pct(item.y1_pct),
            as_of: format_time(item.timestamp),
            stale: if item.is_stale { "yes" } else { "" }.to_string(),
        }
    }
}

/// One chart point.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct SeriesPointDisplay {
    #[tabled(rename = "DATE")]
    pub date: String,

    #[tabled(rename = "VALUE")]
    pub value: String,
}

impl From<&SparkPoint> for SeriesPointDisplay {
    fn from(point: &SparkPoint) -> Self {
        Self {
            date: point.t.format("%Y-%m-%d").to_string(),
            value: point.v.to_string(),
        }
    }
}
