//! Daily candle price feed over HTTP.
//!
//! Queries `{base_url}/assets/{asset_id}/candles` with a one-day interval and
//! keeps the close of every candle, keyed by its UTC date.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::retry_after::{DEFAULT_RETRY_AFTER, parse_retry_after};
use crate::application::ports::{PriceFeedError, PriceFeedPort};
use crate::config::PriceFeedConfig;
use crate::domain::PriceSeries;

const DAILY_INTERVAL_SECS: u64 = 86_400;

/// One candle as returned by the indexer. Other fields are ignored.
#[derive(Debug, Deserialize)]
struct Candle {
    timestamp: i64,
    close: Decimal,
}

/// HTTP adapter for the candle endpoint.
#[derive(Debug, Clone)]
pub struct CandlePriceFeed {
    client: Client,
    base_url: String,
    network_id: u64,
    denominating_asset_id: u64,
}

impl CandlePriceFeed {
    /// Create a new feed from config.
    pub fn new(config: &PriceFeedConfig) -> Result<Self, PriceFeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PriceFeedError::Network {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            network_id: config.network_id,
            denominating_asset_id: config.denominating_asset_id,
        })
    }

    fn candles_url(&self, asset_id: &str) -> String {
        format!("{}/assets/{asset_id}/candles", self.base_url)
    }
}

/// Unix bounds covering whole UTC days from `start` through `end`.
fn unix_bounds(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    let from = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let to = end
        .and_hms_opt(23, 59, 59)
        .map_or(from, |t| t.and_utc().timestamp());
    (from, to)
}

#[async_trait]
impl PriceFeedPort for CandlePriceFeed {
    async fn daily_closes(
        &self,
        asset_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceFeedError> {
        let (from, to) = unix_bounds(start, end);
        let response = self
            .client
            .get(self.candles_url(asset_id))
            .query(&[
                ("network_id", self.network_id.to_string()),
                ("interval", DAILY_INTERVAL_SECS.to_string()),
                ("start", from.to_string()),
                ("end", to.to_string()),
                (
                    "denominating_asset_id",
                    self.denominating_asset_id.to_string(),
                ),
                ("volume_in_denominating_asset", "false".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PriceFeedError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, Utc::now()))
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(PriceFeedError::RateLimited { retry_after });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(PriceFeedError::NotFound {
                asset: asset_id.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PriceFeedError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| PriceFeedError::Network {
            message: e.to_string(),
        })?;
        let candles: Vec<Candle> =
            serde_json::from_str(&body).map_err(|e| PriceFeedError::Decode {
                message: e.to_string(),
            })?;

        let mut series = PriceSeries::new(asset_id);
        for candle in &candles {
            let date = DateTime::from_timestamp(candle.timestamp, 0)
                .ok_or_else(|| PriceFeedError::Decode {
                    message: format!("candle timestamp out of range: {}", candle.timestamp),
                })?
                .date_naive();
            series.insert(date, candle.close);
        }

        debug!(
            asset = asset_id,
            candles = candles.len(),
            %start,
            %end,
            "Fetched daily closes"
        );
        Ok(series)
    }
}
