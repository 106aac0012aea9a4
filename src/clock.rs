//! Wall-clock abstraction
//!
//! Cache expiry, global staleness, the rate limiter window and monitor
//! timestamps all read time through [`Clock`] so tests can move time by hand.
//! User-facing timestamps are rendered in Stockholm local time.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serializer;

/// Zone used for every displayed timestamp.
pub const DISPLAY_TZ: Tz = chrono_tz::Europe::Stockholm;

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Convert a UTC instant to display local time.
pub fn to_local(value: DateTime<Utc>) -> DateTime<Tz> {
    value.with_timezone(&DISPLAY_TZ)
}

/// Short local form for tables, e.g. `2026-01-15 10:30 CET`.
pub fn format_local(value: DateTime<Utc>) -> String {
    to_local(value).format("%Y-%m-%d %H:%M %Z").to_string()
}

/// Serde helper writing a UTC instant as local RFC 3339.
pub fn serialize_local<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_local(*value).to_rfc3339())
}

pub fn serialize_local_opt<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serialize_local(value, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
pub use manual::ManualClock;
