//! Quote-backed summaries and series (commodities, equities)

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{ModuleSource, SummaryBatch, build_item, last_two, placeholder_item, to_spark_points};
use crate::client::parallel::fetch_each;
use crate::client::yahoo::yahoo_period;
use crate::client::{QuoteApi, RateLimit, UpstreamGuard, YAHOO_PROVIDER};
use crate::clock::Clock;
use crate::config::Instrument;
use crate::error::ProviderError;
use crate::metrics::calculate_metrics_at;
use crate::models::{HistoryPoint, RangeKey, SparkPoint};

pub struct MarketDataService {
    quotes: Arc<dyn QuoteApi>,
    guard: UpstreamGuard,
    limit: RateLimit,
    clock: Arc<dyn Clock>,
    max_concurrent: usize,
}

impl MarketDataService {
    pub fn new(
        quotes: Arc<dyn QuoteApi>,
        guard: UpstreamGuard,
        limit: RateLimit,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            quotes,
            guard,
            limit,
            clock,
            max_concurrent: super::DEFAULT_FETCH_CONCURRENCY,
        }
    }

    async fn history(
        &self,
        ticker: &str,
        range: RangeKey,
    ) -> Result<Vec<HistoryPoint>, ProviderError> {
        let quotes = &*self.quotes;
        self.guard
            .call(YAHOO_PROVIDER, self.limit, ticker, || {
                quotes.fetch_history(ticker, range)
            })
            .await
    }
}

#[async_trait]
impl ModuleSource for MarketDataService {
    fn source_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_summary(&self, instruments: &[Instrument]) -> SummaryBatch {
        let mut ordered = instruments.to_vec();
        ordered.sort_by_key(|item| item.sort_order);

        let results = fetch_each(
            ordered,
            |instrument: Instrument| async move {
                self.history(&instrument.ticker, RangeKey::OneYear).await
            },
            self.max_concurrent,
        )
        .await;

        let now = self.clock.now();
        let mut batch = SummaryBatch::default();
        for (instrument, result) in results {
            match result {
                Ok(history) => match last_two(&history) {
                    Some((last, prev_close)) => {
                        let metrics = calculate_metrics_at(now, Some(last), prev_close, &history);
                        batch.items.push(build_item(&instrument, last, metrics, &history));
                    }
                    None => {
                        batch.errors.insert(
                            instrument.ticker.clone(),
                            ProviderError::NoData(instrument.ticker.clone()).to_string(),
                        );
                        batch.items.push(placeholder_item(&instrument));
                    }
                },
                Err(err) => {
                    debug!("Summary fetch failed for {}: {}", instrument.ticker, err);
                    batch.errors.insert(instrument.ticker.clone(), err.to_string());
                    batch.items.push(placeholder_item(&instrument));
                }
            }
        }
        batch
    }

    async fn fetch_series(
        &self,
        instrument: &Instrument,
        range: RangeKey,
    ) -> Result<Vec<SparkPoint>, ProviderError> {
        yahoo_period(range)?;
        let history = self.history(&instrument.ticker, range).await?;
        Ok(to_spark_points(&history, instrument.precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockFailure, MockQuoteApi};
    use crate::client::retry::RecordingSleeper;
    use crate::client::{ProviderMonitor, RetryPolicy, SlidingWindowRateLimiter};
    use crate::clock::ManualClock;
    use crate::models::Module;
    use crate::services::fixtures::{daily, instrument};
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 20, 0, 0).unwrap()
    }

    fn service(
        quotes: MockQuoteApi,
        limit: RateLimit,
    ) -> (MarketDataService, Arc<ProviderMonitor>) {
        let clock = Arc::new(ManualClock::new(now()));
        let monitor = Arc::new(ProviderMonitor::new(clock.clone()));
        let retry = RetryPolicy::new(2, Duration::from_millis(1))
            .with_sleeper(Arc::new(RecordingSleeper::default()))
            .with_seed(3);
        let guard = UpstreamGuard::new(
            Arc::new(SlidingWindowRateLimiter::new(clock.clone())),
            monitor.clone(),
            Arc::new(retry),
        );
        (
            MarketDataService::new(Arc::new(quotes), guard, limit, clock),
            monitor,
        )
    }

    #[tokio::test]
    async fn test_summary_orders_items_and_isolates_failures() {
        let quotes = MockQuoteApi::new()
            .with_history("GC=F", daily(now(), 400, 2000.0))
            .with_failure("SI=F", MockFailure::NoData);
        let (service, monitor) = service(quotes, RateLimit::new(100, 60));

        let instruments = vec![
            instrument("silver", "SI=F", Module::Commodities, 2),
            instrument("gold", "GC=F", Module::Commodities, 1),
        ];
        let batch = service.fetch_summary(&instruments).await;

        let ids: Vec<_> = batch.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["gold", "silver"]);

        let gold = &batch.items[0];
        assert_eq!(gold.last, Some(2399.0));
        assert_eq!(gold.day_abs, Some(1.0));
        assert!(gold.w1_pct.is_some());
        assert!(gold.y1_pct.is_some());
        assert!(!gold.is_stale);

        let silver = &batch.items[1];
        assert!(silver.is_stale);
        assert!(silver.last.is_none());
        assert!(batch.errors.contains_key("SI=F"));
        assert!(batch.has_fresh_values());

        let yahoo = &monitor.snapshot()[YAHOO_PROVIDER];
        assert_eq!(yahoo.attempts, 2);
        assert_eq!(yahoo.success, 1);
        assert_eq!(yahoo.fail, 1);
    }

    #[tokio::test]
    async fn test_summary_fetches_one_year() {
        let quotes = MockQuoteApi::new().with_history("AAPL", daily(now(), 10, 200.0));
        let api = quotes.clone();
        let (service, _) = service(quotes, RateLimit::new(100, 60));

        service
            .fetch_summary(&[instrument("aapl", "AAPL", Module::Mag7, 0)])
            .await;
        assert_eq!(
            api.requested_ranges().await,
            vec![("AAPL".to_string(), RangeKey::OneYear)]
        );
    }

    #[tokio::test]
    async fn test_rate_limited_tickers_become_placeholders() {
        let quotes = MockQuoteApi::new()
            .with_history("AAPL", daily(now(), 5, 1.0))
            .with_history("MSFT", daily(now(), 5, 1.0));
        let (service, _) = service(quotes, RateLimit::new(1, 60));

        let batch = service
            .fetch_summary(&[
                instrument("aapl", "AAPL", Module::Mag7, 0),
                instrument("msft", "MSFT", Module::Mag7, 1),
            ])
            .await;

        assert_eq!(batch.errors.len(), 1);
        let message = batch.errors.values().next().unwrap();
        assert!(message.contains("Rate limit"));
        assert_eq!(batch.items.iter().filter(|i| i.has_value()).count(), 1);
    }

    #[tokio::test]
    async fn test_series_rounds_points() {
        let quotes = MockQuoteApi::new().with_history("BZ=F", daily(now(), 3, 80.456));
        let (service, _) = service(quotes, RateLimit::new(100, 60));

        let brent = instrument("brent", "BZ=F", Module::Commodities, 0);
        let points = service.fetch_series(&brent, RangeKey::OneMonth).await.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].v, 80.46);
    }

    #[tokio::test]
    async fn test_six_month_series_is_rejected_before_any_call() {
        let quotes = MockQuoteApi::new().with_history("BZ=F", daily(now(), 3, 80.0));
        let api = quotes.clone();
        let (service, monitor) = service(quotes, RateLimit::new(100, 60));

        let brent = instrument("brent", "BZ=F", Module::Commodities, 0);
        let err = service
            .fetch_series(&brent, RangeKey::SixMonths)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedRange(_)));
        assert_eq!(api.call_count("BZ=F").await, 0);
        assert!(monitor.snapshot().is_empty());
    }
}
