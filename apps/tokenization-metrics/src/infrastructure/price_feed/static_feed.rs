//! In-memory price feed with scripted failures.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::application::ports::{PriceFeedError, PriceFeedPort};
use crate::domain::PriceSeries;

/// Price feed serving preloaded series.
///
/// Used by tests and offline demos. Assets can be scripted to fail
/// permanently or to be rate limited a given number of times.
#[derive(Debug, Default)]
pub struct StaticPriceFeed {
    series: RwLock<HashMap<String, PriceSeries>>,
    failures: RwLock<HashMap<String, PriceFeedError>>,
    rate_limits: RwLock<HashMap<String, (Duration, u32)>>,
    calls: RwLock<HashMap<String, usize>>,
}

impl StaticPriceFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `series` for its asset.
    pub fn set_series(&self, series: PriceSeries) {
        self.series.write().insert(series.asset.clone(), series);
    }

    /// Make every request for `asset` fail with `error`.
    pub fn fail_with(&self, asset: &str, error: PriceFeedError) {
        self.failures.write().insert(asset.to_string(), error);
    }

    /// Answer the next `times` requests for `asset` with a rate limit.
    pub fn rate_limit_next(&self, asset: &str, retry_after: Duration, times: u32) {
        self.rate_limits
            .write()
            .insert(asset.to_string(), (retry_after, times));
    }

    /// Requests seen for `asset`.
    #[must_use]
    pub fn calls(&self, asset: &str) -> usize {
        self.calls.read().get(asset).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PriceFeedPort for StaticPriceFeed {
    async fn daily_closes(
        &self,
        asset_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceFeedError> {
        *self.calls.write().entry(asset_id.to_string()).or_insert(0) += 1;

        if let Some((retry_after, remaining)) = self.rate_limits.write().get_mut(asset_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PriceFeedError::RateLimited {
                    retry_after: *retry_after,
                });
            }
        }

        if let Some(error) = self.failures.read().get(asset_id) {
            return Err(error.clone());
        }

        self.series
            .read()
            .get(asset_id)
            .map(|series| series.between(start, end))
            .ok_or_else(|| PriceFeedError::NotFound {
                asset: asset_id.to_string(),
            })
    }
}
