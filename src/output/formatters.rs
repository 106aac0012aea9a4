//! Reusable formatting utilities for CLI output
//!
//! Missing values render as `-`, timestamps in Stockholm local time.

use chrono::{DateTime, Utc};

use crate::clock::format_local;

const MISSING: &str = "-";

/// Value with a fixed number of decimals.
pub fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => MISSING.to_string(),
    }
}

/// Signed percentage, e.g. `+1.25%`.
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.2}%", v),
        None => MISSING.to_string(),
    }
}

pub fn format_time(value: Option<DateTime<Utc>>) -> String {
    value.map(format_local).unwrap_or_else(|| MISSING.to_string())
}

/// Format a duration in milliseconds to a human-readable string.
///
/// # Example output
/// - `2m 5s`
/// - `4.2s`
/// - `850ms`
pub fn format_duration_ms(millis: i64) -> String {
    if millis < 1000 {
        return format!("{}ms", millis.max(0));
    }

    let secs = millis / 1000;
    let mins = secs / 60;
    if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}

/// Age in seconds, e.g. `45s`, `3m 10s`, `2h 5m`.
pub fn format_age(seconds: i64) -> String {
    let secs = seconds.max(0);
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;

    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
