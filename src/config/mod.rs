//! Runtime settings for ekodash
//!
//! Every tunable comes from the environment; CLI flags may override the
//! file locations afterwards.

pub mod instruments;

use std::path::PathBuf;
use std::time::Duration;

use crate::client::rate_limit::RateLimit;
use crate::error::{Result, StorageError};

#[cfg(test)]
pub use instruments::StaticInstruments;
pub use instruments::{
    DEFAULT_INSTRUMENTS_PATH, Instrument, InstrumentSource, InstrumentsFile, YamlInstruments,
};

pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;
pub const DEFAULT_STALE_THRESHOLD_SECONDS: u64 = 600;
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_YAHOO_MAX_CALLS: u32 = 120;
pub const DEFAULT_YAHOO_PERIOD_SECONDS: u64 = 60;
pub const DEFAULT_FRED_MAX_CALLS: u32 = 60;
pub const DEFAULT_FRED_PERIOD_SECONDS: u64 = 60;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 250;

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const FRED_BASE_URL: &str = "https://fred.stlouisfed.org";

/// Process-wide settings resolved at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_ttl_seconds: u64,
    pub stale_threshold_seconds: u64,
    pub refresh_interval_seconds: u64,
    pub yahoo_limit: RateLimit,
    pub fred_limit: RateLimit,
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
    pub scheduler_enabled: bool,
    pub instruments_path: PathBuf,
    pub database_path: Option<PathBuf>,
    pub yahoo_base_url: String,
    pub fred_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            stale_threshold_seconds: DEFAULT_STALE_THRESHOLD_SECONDS,
            refresh_interval_seconds: DEFAULT_REFRESH_INTERVAL_SECONDS,
            yahoo_limit: RateLimit::new(DEFAULT_YAHOO_MAX_CALLS, DEFAULT_YAHOO_PERIOD_SECONDS),
            fred_limit: RateLimit::new(DEFAULT_FRED_MAX_CALLS, DEFAULT_FRED_PERIOD_SECONDS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
            scheduler_enabled: true,
            instruments_path: PathBuf::from(DEFAULT_INSTRUMENTS_PATH),
            database_path: None,
            yahoo_base_url: YAHOO_BASE_URL.to_string(),
            fred_base_url: FRED_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |name: &str, default: u64| -> u64 {
            lookup(name)
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .filter(|value| *value > 0)
                .map(|value| value as u64)
                .unwrap_or(default)
        };

        // Out-of-range counts fall back to the default instead of wrapping
        let positive_u32 = |name: &str, default: u32| -> u32 {
            u32::try_from(positive(name, u64::from(default))).unwrap_or(default)
        };

        let yahoo_limit = RateLimit::new(
            positive_u32("EKODASH_YAHOO_MAX_CALLS", DEFAULT_YAHOO_MAX_CALLS),
            positive("EKODASH_YAHOO_PERIOD_SECONDS", DEFAULT_YAHOO_PERIOD_SECONDS),
        );
        let fred_limit = RateLimit::new(
            positive_u32("EKODASH_FRED_MAX_CALLS", DEFAULT_FRED_MAX_CALLS),
            positive("EKODASH_FRED_PERIOD_SECONDS", DEFAULT_FRED_PERIOD_SECONDS),
        );

        let scheduler_enabled = !lookup("EKODASH_DISABLE_SCHEDULER")
            .map(|raw| is_truthy(&raw))
            .unwrap_or(false);

        Self {
            cache_ttl_seconds: positive("EKODASH_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS),
            stale_threshold_seconds: positive(
                "EKODASH_STALE_THRESHOLD_SECONDS",
                DEFAULT_STALE_THRESHOLD_SECONDS,
            ),
            refresh_interval_seconds: positive(
                "EKODASH_REFRESH_INTERVAL_SECONDS",
                DEFAULT_REFRESH_INTERVAL_SECONDS,
            ),
            yahoo_limit,
            fred_limit,
            retry_attempts: positive_u32("EKODASH_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS),
            retry_base_ms: positive("EKODASH_RETRY_BASE_MS", DEFAULT_RETRY_BASE_MS),
            scheduler_enabled,
            instruments_path: lookup("EKODASH_INSTRUMENTS")
                .filter(|raw| !raw.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTRUMENTS_PATH)),
            database_path: lookup("EKODASH_DATABASE")
                .filter(|raw| !raw.trim().is_empty())
                .map(PathBuf::from),
            yahoo_base_url: lookup("EKODASH_YAHOO_BASE_URL")
                .filter(|raw| !raw.trim().is_empty())
                .unwrap_or_else(|| YAHOO_BASE_URL.to_string()),
            fred_base_url: lookup("EKODASH_FRED_BASE_URL")
                .filter(|raw| !raw.trim().is_empty())
                .unwrap_or_else(|| FRED_BASE_URL.to_string()),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    /// Database file, falling back to the per-user data directory.
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.database_path {
            return Ok(path.clone());
        }
        let base = dirs::data_local_dir().ok_or(StorageError::NoDataDir)?;
        Ok(base.join("ekodash").join("ekodash.db"))
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
