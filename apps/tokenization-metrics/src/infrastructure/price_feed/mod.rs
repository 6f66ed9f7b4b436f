//! Price Feed Adapters
//!
//! Implementations of `PriceFeedPort`.

pub mod candles;
pub mod retry_after;
pub mod static_feed;

pub use candles::CandlePriceFeed;
pub use retry_after::{DEFAULT_RETRY_AFTER, parse_retry_after};
pub use static_feed::StaticPriceFeed;
