//! Historical price feed configuration.

use serde::{Deserialize, Serialize};

/// Candle price feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    /// Indexer base URL, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP client timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Network the assets live on.
    #[serde(default)]
    pub network_id: u64,
    /// Asset prices are denominated in (0 = the network's native asset).
    #[serde(default)]
    pub denominating_asset_id: u64,
    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            network_id: 0,
            denominating_asset_id: 0,
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://indexer.vestige.fi".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("tokenization-metrics/", env!("CARGO_PKG_VERSION")).to_string()
}
