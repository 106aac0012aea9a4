//! Composition root
//!
//! Builds the one cache, limiter, monitor and retry policy a process uses and
//! hands references to the services, the read path and the scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::cache::{DashboardCache, TtlCache};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::{
    FredClient, ProviderMonitor, RetryPolicy, SlidingWindowRateLimiter, UpstreamGuard, YahooClient,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{InstrumentSource, Settings, YamlInstruments};
use crate::error::Result;
use crate::scheduler::{Refresher, Scheduler};
use crate::services::{DashboardService, InflationService, MarketDataService, Sources};
use crate::storage::SqliteStore;

/// Shared state for one command invocation.
pub struct AppContext {
    pub settings: Settings,
    pub format: OutputFormat,
    pub clock: Arc<dyn Clock>,
    pub cache: Arc<DashboardCache>,
    pub monitor: Arc<ProviderMonitor>,
    pub instruments: Arc<dyn InstrumentSource>,
    pub sources: Sources,
}

impl AppContext {
    /// Settings from the environment with CLI overrides applied.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let settings = opts.apply(Settings::from_env());
        Self::with_settings(settings, opts.format)
    }

    pub fn with_settings(settings: Settings, format: OutputFormat) -> Result<Self> {
        debug!("Settings: {:?}", settings);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(TtlCache::with_clock(
            settings.cache_ttl_seconds,
            settings.stale_threshold_seconds,
            clock.clone(),
        ));
        let monitor = Arc::new(ProviderMonitor::new(clock.clone()));
        let limiter = Arc::new(SlidingWindowRateLimiter::new(clock.clone()));
        let retry = Arc::new(RetryPolicy::new(
            settings.retry_attempts,
            settings.retry_base_delay(),
        ));
        let guard = UpstreamGuard::new(limiter, monitor.clone(), retry);

        let market = MarketDataService::new(
            Arc::new(YahooClient::new(settings.yahoo_base_url.clone())?),
            guard.clone(),
            settings.yahoo_limit,
            clock.clone(),
        );
        let inflation = InflationService::new(
            Arc::new(FredClient::new(settings.fred_base_url.clone())?),
            guard,
            settings.fred_limit,
            clock.clone(),
        );

        let instruments: Arc<dyn InstrumentSource> =
            Arc::new(YamlInstruments::new(settings.instruments_path.clone()));

        Ok(Self {
            settings,
            format,
            clock,
            cache,
            monitor,
            instruments,
            sources: Sources::new(Arc::new(market), Arc::new(inflation)),
        })
    }

    /// Read path, backed by the refresh database when one exists.
    pub fn dashboard(&self) -> Result<DashboardService> {
        let dashboard = DashboardService::new(
            self.cache.clone(),
            self.sources.clone(),
            self.instruments.clone(),
        );
        match self.existing_store()? {
            Some(store) => Ok(dashboard.with_store(store)),
            None => Ok(dashboard),
        }
    }

    /// Open the database only if a refresh has created it.
    fn existing_store(&self) -> Result<Option<Arc<SqliteStore>>> {
        let path = match self.database_path() {
            Ok(path) => path,
            Err(err) => {
                debug!("Database path unavailable: {}", err);
                return Ok(None);
            }
        };
        if !path.exists() {
            debug!("No database at {}, reading upstream only", path.display());
            return Ok(None);
        }
        self.open_store().map(Some)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        self.settings.resolve_database_path()
    }

    pub fn open_store(&self) -> Result<Arc<SqliteStore>> {
        let path = self.database_path()?;
        debug!("Opening database at {}", path.display());
        Ok(Arc::new(SqliteStore::open_at(&path)?))
    }

    pub fn refresher(&self, store: Arc<SqliteStore>) -> Refresher {
        Refresher::new(
            self.instruments.clone(),
            self.sources.clone(),
            self.cache.clone(),
            store,
            self.monitor.clone(),
            self.clock.clone(),
        )
    }

    pub fn scheduler(&self, store: Arc<SqliteStore>) -> Scheduler {
        Scheduler::new(
            Arc::new(self.refresher(store)),
            self.settings.refresh_interval(),
            self.settings.scheduler_enabled,
        )
    }
}
