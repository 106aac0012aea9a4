//! Change metrics and the year-over-year transform
//!
//! Pure functions over ascending [`HistoryPoint`] sequences.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::models::{HistoryPoint, RangeKey, SummaryMetrics};

/// `(current - reference) / reference * 100`, or `None` when either side is
/// missing or the reference is zero.
pub fn percent_change(current: Option<f64>, reference: Option<f64>) -> Option<f64> {
    match (current, reference) {
        (Some(current), Some(reference)) if reference != 0.0 => {
            Some((current - reference) / reference * 100.0)
        }
        _ => None,
    }
}

/// Round to `precision` decimals; exact halves go to the even neighbour.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round_ties_even() / factor
}

pub fn round_opt(value: Option<f64>, precision: u32) -> Option<f64> {
    value.map(|v| round_to(v, precision))
}

/// Most recent point with `timestamp <= cutoff`, scanning newest first.
pub fn point_at_or_before(points: &[HistoryPoint], cutoff: DateTime<Utc>) -> Option<&HistoryPoint> {
    points.iter().rev().find(|p| p.timestamp <= cutoff)
}

/// Earliest point in calendar year `year`, scanning oldest first.
pub fn first_point_of_year(points: &[HistoryPoint], year: i32) -> Option<&HistoryPoint> {
    points.iter().find(|p| p.timestamp.year() == year)
}

/// Metrics relative to the current time.
pub fn calculate_metrics(
    last: Option<f64>,
    prev_close: Option<f64>,
    history: &[HistoryPoint],
) -> SummaryMetrics {
    calculate_metrics_at(Utc::now(), last, prev_close, history)
}

/// Metrics relative to `now`.
pub fn calculate_metrics_at(
    now: DateTime<Utc>,
    last: Option<f64>,
    prev_close: Option<f64>,
    history: &[HistoryPoint],
) -> SummaryMetrics {
    let week_ref = point_at_or_before(history, now - Duration::days(7)).map(|p| p.value);
    let year_ref = point_at_or_before(history, now - Duration::days(365)).map(|p| p.value);
    let ytd_ref = first_point_of_year(history, now.year()).map(|p| p.value);

    let day_abs = match (last, prev_close) {
        (Some(last), Some(prev)) => Some(last - prev),
        _ => None,
    };

    SummaryMetrics {
        day_abs,
        day_pct: percent_change(last, prev_close),
        week_pct: percent_change(last, week_ref),
        ytd_pct: percent_change(last, ytd_ref),
        year_pct: percent_change(last, year_ref),
    }
}

/// Year-over-year percentage series from a level series.
///
/// Each point is compared with the point of the same month one year earlier;
/// points without a non-zero anchor are dropped. Output is sorted by
/// timestamp.
pub fn to_yoy_points(points: &[HistoryPoint]) -> Vec<HistoryPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.timestamp);

    let by_month: HashMap<(i32, u32), f64> = sorted
        .iter()
        .map(|p| ((p.timestamp.year(), p.timestamp.month()), p.value))
        .collect();

    sorted
        .iter()
        .filter_map(|p| {
            let anchor = by_month.get(&(p.timestamp.year() - 1, p.timestamp.month()))?;
            percent_change(Some(p.value), Some(*anchor)).map(|v| HistoryPoint::new(p.timestamp, v))
        })
        .collect()
}

/// Points within `31 * months` days of the latest point.
pub fn filter_by_range(points: &[HistoryPoint], range: RangeKey) -> Vec<HistoryPoint> {
    let Some(latest) = points.last() else {
        return Vec::new();
    };
    let cutoff = latest.timestamp - Duration::days(31 * range.months() as i64);
    points
        .iter()
        .filter(|p| p.timestamp >= cutoff)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value present");
        assert!(
            (actual - expected).abs() < 1e-3,
            "{} != {}",
            actual,
            expected
        );
    }

    #[test]
    fn test_percent_change_guards() {
        assert_eq!(percent_change(Some(110.0), Some(100.0)), Some(10.0));
        assert_eq!(percent_change(None, Some(100.0)), None);
        assert_eq!(percent_change(Some(1.0), None), None);
        assert_eq!(percent_change(Some(1.0), Some(0.0)), None);
    }

    #[test]
    fn test_day_metrics_without_history() {
        let now = at(2026, 6, 15);
        let history = vec![HistoryPoint::new(at(2026, 6, 14), 99.0)];
        let metrics = calculate_metrics_at(now, Some(100.0), Some(99.0), &history);

        assert_eq!(metrics.day_abs, Some(1.0));
        approx(metrics.day_pct, 1.0101);
        assert_eq!(metrics.week_pct, None);
        assert_eq!(metrics.year_pct, None);
        approx(metrics.ytd_pct, 1.0101);
    }

    #[test]
    fn test_week_and_year_use_latest_point_before_cutoff() {
        let now = at(2026, 6, 15);
        let history = vec![
            HistoryPoint::new(at(2025, 6, 1), 50.0),
            HistoryPoint::new(at(2025, 6, 14), 80.0),
            HistoryPoint::new(at(2026, 1, 2), 90.0),
            HistoryPoint::new(at(2026, 6, 1), 95.0),
            HistoryPoint::new(at(2026, 6, 8), 96.0),
            HistoryPoint::new(at(2026, 6, 12), 99.0),
        ];
        let metrics = calculate_metrics_at(now, Some(100.0), Some(99.0), &history);

        // now - 7d = 06-08, inclusive
        approx(metrics.week_pct, (100.0 - 96.0) / 96.0 * 100.0);
        // now - 365d = 2025-06-15 -> 2025-06-14
        approx(metrics.year_pct, 25.0);
        // first point of 2026
        approx(metrics.ytd_pct, (100.0 - 90.0) / 90.0 * 100.0);
    }

    #[test]
    fn test_missing_last_yields_all_none() {
        let metrics = calculate_metrics_at(at(2026, 1, 1), None, Some(5.0), &[]);
        assert_eq!(metrics, SummaryMetrics::default());
    }

    #[test]
    fn test_yoy_transform_drops_unanchored_points() {
        let raw = vec![
            HistoryPoint::new(at(2024, 1, 1), 300.0),
            HistoryPoint::new(at(2025, 1, 1), 306.0),
            HistoryPoint::new(at(2026, 1, 1), 312.0),
        ];
        let yoy = to_yoy_points(&raw);

        assert_eq!(yoy.len(), 2);
        assert_eq!(yoy[0].timestamp, at(2025, 1, 1));
        approx(Some(yoy[0].value), 2.0);
        assert_eq!(yoy[1].timestamp, at(2026, 1, 1));
        approx(Some(yoy[1].value), 1.9608);
    }

    #[test]
    fn test_yoy_transform_sorts_input_and_skips_zero_anchor() {
        let raw = vec![
            HistoryPoint::new(at(2025, 2, 1), 10.0),
            HistoryPoint::new(at(2024, 2, 1), 0.0),
            HistoryPoint::new(at(2025, 3, 1), 12.0),
            HistoryPoint::new(at(2024, 3, 1), 10.0),
        ];
        let yoy = to_yoy_points(&raw);
        assert_eq!(yoy.len(), 1);
        assert_eq!(yoy[0].timestamp, at(2025, 3, 1));
        approx(Some(yoy[0].value), 20.0);
    }

    #[test]
    fn test_filter_by_range_uses_latest_point() {
        let points: Vec<HistoryPoint> = (1..=12)
            .map(|m| HistoryPoint::new(at(2025, m, 1), m as f64))
            .collect();

        let three = filter_by_range(&points, RangeKey::ThreeMonths);
        assert_eq!(three.first().unwrap().timestamp, at(2025, 9, 1));
        assert_eq!(three.len(), 4);

        assert_eq!(filter_by_range(&points, RangeKey::OneYear).len(), 12);
        assert!(filter_by_range(&[], RangeKey::OneMonth).is_empty());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(3.5, 0), 4.0);
        assert_eq!(round_to(-0.5, 0), -0.0);
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_opt(None, 2), None);
    }
}
