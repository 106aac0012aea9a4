//! Mock upstream providers for testing
//!
//! Serve canned histories and inject failures without touching the network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{ObservationApi, QuoteApi};
use crate::error::ProviderError;
use crate::models::{HistoryPoint, RangeKey};

/// Failure a mock should produce for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    NoData,
    Server,
    Network,
}

impl MockFailure {
    fn to_error(self, key: &str) -> ProviderError {
        match self {
            MockFailure::NoData => ProviderError::NoData(key.to_string()),
            MockFailure::Server => ProviderError::Server(format!("503 for {}", key)),
            MockFailure::Network => ProviderError::Network(format!("connection reset ({})", key)),
        }
    }
}

#[derive(Default)]
struct MockState {
    data: HashMap<String, Vec<HistoryPoint>>,
    failures: HashMap<String, MockFailure>,
    /// Remaining transient failures per key before data is served
    transient: HashMap<String, usize>,
    calls: HashMap<String, usize>,
}

impl MockState {
    fn serve(&mut self, key: &str) -> Result<Vec<HistoryPoint>, ProviderError> {
        *self.calls.entry(key.to_string()).or_default() += 1;

        if let Some(failure) = self.failures.get(key) {
            return Err(failure.to_error(key));
        }
        if let Some(remaining) = self.transient.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MockFailure::Server.to_error(key));
            }
        }
        match self.data.get(key) {
            Some(points) if !points.is_empty() => Ok(points.clone()),
            _ => Err(ProviderError::NoData(key.to_string())),
        }
    }
}

/// Mock quote provider keyed by ticker.
///
/// # Example
/// ```ignore
/// let quotes = MockQuoteApi::new()
///     .with_history("GC=F", points)
///     .with_failure("SI=F", MockFailure::Server);
/// ```
#[derive(Clone, Default)]
pub struct MockQuoteApi {
    state: Arc<Mutex<MockState>>,
    ranges: Arc<Mutex<Vec<(String, RangeKey)>>>,
}

impl MockQuoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, ticker: &str, points: Vec<HistoryPoint>) -> Self {
        self.state
            .try_lock()
            .expect("mock not shared yet")
            .data
            .insert(ticker.to_string(), points);
        self
    }

    pub fn with_failure(self, ticker: &str, failure: MockFailure) -> Self {
        self.state
            .try_lock()
            .expect("mock not shared yet")
            .failures
            .insert(ticker.to_string(), failure);
        self
    }

    /// Fail `times` calls with a server error, then serve data.
    pub fn with_transient_failures(self, ticker: &str, times: usize) -> Self {
        self.state
            .try_lock()
            .expect("mock not shared yet")
            .transient
            .insert(ticker.to_string(), times);
        self
    }

    pub async fn call_count(&self, ticker: &str) -> usize {
        self.state.lock().await.calls.get(ticker).copied().unwrap_or(0)
    }

    /// Every (ticker, range) requested, in call order.
    pub async fn requested_ranges(&self) -> Vec<(String, RangeKey)> {
        self.ranges.lock().await.clone()
    }
}

#[async_trait]
impl QuoteApi for MockQuoteApi {
    async fn fetch_history(
        &self,
        ticker: &str,
        range: RangeKey,
    ) -> Result<Vec<HistoryPoint>, ProviderError> {
        self.ranges.lock().await.push((ticker.to_string(), range));
        self.state.lock().await.serve(ticker)
    }
}

/// Mock observation provider keyed by series code.
#[derive(Clone, Default)]
pub struct MockObservationApi {
    state: Arc<Mutex<MockState>>,
}

impl MockObservationApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, series_id: &str, points: Vec<HistoryPoint>) -> Self {
        self.state
            .try_lock()
            .expect("mock not shared yet")
            .data
            .insert(series_id.to_string(), points);
        self
    }

    pub fn with_failure(self, series_id: &str, failure: MockFailure) -> Self {
        self.state
            .try_lock()
            .expect("mock not shared yet")
            .failures
            .insert(series_id.to_string(), failure);
        self
    }

    pub async fn call_count(&self, series_id: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(series_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ObservationApi for MockObservationApi {
    async fn fetch_observations(
        &self,
        series_id: &str,
    ) -> Result<Vec<HistoryPoint>, ProviderError> {
        self.state.lock().await.serve(series_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point(day: u32, value: f64) -> HistoryPoint {
        HistoryPoint::new(Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(), value)
    }

    #[tokio::test]
    async fn test_mock_quote_serves_and_counts() {
        let mock = MockQuoteApi::new().with_history("GC=F", vec![point(2, 2650.0)]);
        let points = mock.fetch_history("GC=F", RangeKey::OneYear).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(mock.call_count("GC=F").await, 1);
        assert_eq!(
            mock.requested_ranges().await,
            vec![("GC=F".to_string(), RangeKey::OneYear)]
        );
    }

    #[tokio::test]
    async fn test_mock_unknown_key_is_no_data() {
        let mock = MockObservationApi::new();
        let err = mock.fetch_observations("UNRATE").await.unwrap_err();
        assert!(matches!(err, ProviderError::NoData(_)));
    }

    #[tokio::test]
    async fn test_mock_transient_failures_then_data() {
        let mock = MockQuoteApi::new()
            .with_history("AAPL", vec![point(5, 240.0)])
            .with_transient_failures("AAPL", 1);

        assert!(matches!(
            mock.fetch_history("AAPL", RangeKey::OneMonth).await,
            Err(ProviderError::Server(_))
        ));
        assert!(mock.fetch_history("AAPL", RangeKey::OneMonth).await.is_ok());
    }
}
