//! FRED graph CSV client

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use log::debug;
use reqwest::{Client as HttpClient, StatusCode};

use super::ObservationApi;
use crate::error::ProviderError;
use crate::models::HistoryPoint;

const USER_AGENT: &str = concat!("ekodash/", env!("CARGO_PKG_VERSION"));

/// Raw observation series from the `fredgraph.csv` export.
pub struct FredClient {
    http: HttpClient,
    base_url: String,
}

impl FredClient {
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

/// Parse the CSV export.
///
/// The first column is the observation date; the value column is the one
/// named after the series, else the second column. Missing values (`""` or
/// `"."`) and unparsable rows are skipped.
pub fn parse_observations(
    series_id: &str,
    payload: &str,
) -> Result<Vec<HistoryPoint>, ProviderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(payload.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ProviderError::InvalidResponse(format!("Malformed CSV header: {}", e)))?
        .clone();
    let value_column = headers.iter().position(|h| h == series_id).unwrap_or(1);

    let mut points = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else { continue };
        let (Some(date), Some(value)) = (record.get(0), record.get(value_column)) else {
            continue;
        };
        if value.is_empty() || value == "." {
            continue;
        }
        let (Ok(date), Ok(value)) = (
            NaiveDate::parse_from_str(date, "%Y-%m-%d"),
            value.parse::<f64>(),
        ) else {
            continue;
        };
        let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
            continue;
        };
        points.push(HistoryPoint::new(Utc.from_utc_datetime(&midnight), value));
    }

    Ok(points)
}

#[async_trait]
impl ObservationApi for FredClient {
    async fn fetch_observations(
        &self,
        series_id: &str,
    ) -> Result<Vec<HistoryPoint>, ProviderError> {
        let url = format!("{}/graph/fredgraph.csv", self.base_url);
        debug!("GET {} id={}", url, series_id);

        let response = self
            .http
            .get(&url)
            .query(&[("id", series_id)])
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let payload = response.text().await?;
                let points = parse_observations(series_id, &payload)?;
                if points.is_empty() {
                    return Err(ProviderError::NoData(series_id.to_string()));
                }
                Ok(points)
            }
            StatusCode::NOT_FOUND => Err(ProviderError::NoData(series_id.to_string())),
            status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                Err(ProviderError::Server(format!("{} for {}", status, series_id)))
            }
            _ => Err(ProviderError::InvalidResponse(format!(
                "Unexpected status code {} for {}",
                status, series_id
            ))),
        }
    }
}
