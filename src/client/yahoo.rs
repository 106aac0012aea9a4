//! Yahoo Finance chart client

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use log::debug;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

use super::QuoteApi;
use crate::error::ProviderError;
use crate::models::{HistoryPoint, RangeKey};

const USER_AGENT: &str = concat!("ekodash/", env!("CARGO_PKG_VERSION"));

/// Upstream period parameter for a chart range.
pub fn yahoo_period(range: RangeKey) -> Result<&'static str, ProviderError> {
    match range {
        RangeKey::OneMonth => Ok("1mo"),
        RangeKey::ThreeMonths => Ok("3mo"),
        RangeKey::OneYear => Ok("1y"),
        RangeKey::SixMonths => Err(ProviderError::UnsupportedRange(range.to_string())),
    }
}

/// Daily close history from the public chart endpoint.
pub struct YahooClient {
    http: HttpClient,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Pair timestamps with closes, dropping null or non-finite closes.
fn extract_points(
    ticker: &str,
    envelope: ChartEnvelope,
) -> Result<Vec<HistoryPoint>, ProviderError> {
    if let Some(error) = envelope.chart.error {
        debug!(
            "Yahoo chart error for {}: {}",
            ticker,
            error.description.as_deref().unwrap_or("unknown")
        );
        return Err(ProviderError::NoData(ticker.to_string()));
    }

    let result = envelope
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.swap_remove(0)))
        .ok_or_else(|| ProviderError::NoData(ticker.to_string()))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|block| block.close)
        .unwrap_or_default();

    let mut points: Vec<HistoryPoint> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let value = close.filter(|v| v.is_finite())?;
            let timestamp = DateTime::from_timestamp(*ts, 0)?;
            Some(HistoryPoint::new(timestamp, value))
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);

    if points.is_empty() {
        return Err(ProviderError::NoData(ticker.to_string()));
    }
    Ok(points)
}

#[async_trait]
impl QuoteApi for YahooClient {
    async fn fetch_history(
        &self,
        ticker: &str,
        range: RangeKey,
    ) -> Result<Vec<HistoryPoint>, ProviderError> {
        let period = yahoo_period(range)?;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        debug!("GET {} range={}", url, period);

        let response = self
            .http
            .get(&url)
            .query(&[("range", period), ("interval", "1d")])
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let envelope = response.json::<ChartEnvelope>().await.map_err(|e| {
                    ProviderError::InvalidResponse(format!("Failed to parse chart: {}", e))
                })?;
                extract_points(ticker, envelope)
            }
            StatusCode::NOT_FOUND => Err(ProviderError::NoData(ticker.to_string())),
            status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                Err(ProviderError::Server(format!("{} for {}", status, ticker)))
            }
            _ => Err(ProviderError::InvalidResponse(format!(
                "Unexpected status code {} for {}",
                status, ticker
            ))),
        }
    }
}
