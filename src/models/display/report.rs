//! Macro assessment data points

use serde::Serialize;
use tabled::Tabled;

use crate::output::formatters::format_value;
use crate::report::DataPoints;

#[derive(Debug, Clone, Tabled, Serialize)]
pub struct DataPointDisplay {
    #[tabled(rename = "DATA POINT")]
    pub name: String,

    #[tabled(rename = "VALUE")]
    pub value: String,
}

impl DataPointDisplay {
    /// One row per data point present, in a fixed order.
    pub fn rows(points: &DataPoints) -> Vec<Self> {
        let decimals = [
            ("inflation_us_yoy", points.inflation_us_yoy, 2),
            ("mag7_breadth_positive_share", points.mag7_breadth_positive_share, 3),
            ("mag7_avg_day_pct", points.mag7_avg_day_pct, 3),
            ("mag7_avg_ytd_pct", points.mag7_avg_ytd_pct, 3),
            ("brent_usd", points.brent_usd, 2),
            ("wti_usd", points.wti_usd, 2),
            ("copper_day_pct", points.copper_day_pct, 2),
        ];

        let mut rows: Vec<Self> = decimals
            .into_iter()
            .filter(|(_, value, _)| value.is_some())
            .map(|(name, value, precision)| Self {
                name: name.to_string(),
                value: format_value(value, precision),
            })
            .collect();
        if let Some(count) = points.stale_count {
            rows.push(Self {
                name: "stale_count".to_string(),
                value: count.to_string(),
            });
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_skip_absent_points() {
        let points = DataPoints {
            brent_usd: Some(82.456),
            mag7_breadth_positive_share: Some(0.667),
            stale_count: Some(2),
            ..DataPoints::default()
        };

        let rows = DataPointDisplay::rows(&points);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["mag7_breadth_positive_share", "brent_usd", "stale_count"]);
        assert_eq!(rows[0].value, "0.667");
        assert_eq!(rows[1].value, "82.46");
        assert_eq!(rows[2].value, "2");
    }
}
