//! Price Feed Port (Driven Port)
//!
//! Interface for fetching historical daily close prices.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::PriceSeries;

/// Price feed error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceFeedError {
    /// The provider asked us to back off.
    #[error("Rate limited by price feed, retry after {}s", .retry_after.as_secs())]
    RateLimited {
        /// How long the provider asked us to wait.
        retry_after: Duration,
    },

    /// Non-success HTTP status.
    #[error("Price feed returned HTTP {status}: {message}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Transport failure (connect, timeout, TLS).
    #[error("Price feed network error: {message}")]
    Network {
        /// Error details.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Price feed decode error: {message}")]
    Decode {
        /// Error details.
        message: String,
    },

    /// Unknown asset.
    #[error("Asset not found: {asset}")]
    NotFound {
        /// The unknown asset identifier.
        asset: String,
    },
}

impl PriceFeedError {
    /// Whether the provider signalled rate limiting.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Port for historical prices.
#[async_trait]
pub trait PriceFeedPort: Send + Sync {
    /// Daily closes for `asset_id` covering `[start, end]` (UTC dates).
    async fn daily_closes(
        &self,
        asset_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceFeedError>;
}
