//! Query source and cache configuration.

use serde::{Deserialize, Serialize};

use super::observability::default_true;

/// Where query results are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Directory of `<query name>.json` result files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

/// Query result cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether results are cached at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time-to-live of a cached result in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
        }
    }
}

const fn default_ttl_secs() -> u64 {
    3600
}
