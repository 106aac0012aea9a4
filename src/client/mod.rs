//! Upstream data providers and the resilience layer around them

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{HistoryPoint, RangeKey};

pub mod fred;
pub mod guard;
#[cfg(test)]
pub mod mock;
pub mod monitor;
pub mod parallel;
pub mod rate_limit;
pub mod retry;
pub mod yahoo;

pub use fred::FredClient;
pub use guard::UpstreamGuard;
#[cfg(test)]
pub use mock::{MockObservationApi, MockQuoteApi};
pub use monitor::{ProviderMonitor, ProviderStats};
pub use rate_limit::{RateLimit, SlidingWindowRateLimiter};
pub use retry::RetryPolicy;
pub use yahoo::YahooClient;

/// Provider key for quote history.
pub const YAHOO_PROVIDER: &str = "yahoo";

/// Provider key for macro observation series.
pub const FRED_PROVIDER: &str = "fred";

/// Latest quote plus trailing daily history for a ticker.
#[async_trait]
pub trait QuoteApi: Send + Sync {
    /// Daily closes for `ticker` over `range`, oldest first.
    ///
    /// An empty history is [`ProviderError::NoData`].
    async fn fetch_history(
        &self,
        ticker: &str,
        range: RangeKey,
    ) -> Result<Vec<HistoryPoint>, ProviderError>;
}

/// Raw observation series for a series code.
#[async_trait]
pub trait ObservationApi: Send + Sync {
    /// Every published observation for `series_id`, oldest first.
    async fn fetch_observations(&self, series_id: &str) -> Result<Vec<HistoryPoint>, ProviderError>;
}
