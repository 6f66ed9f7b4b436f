//! Configuration for the metrics pipeline.
//!
//! YAML file with `${VAR}` / `${VAR:-default}` environment interpolation,
//! typed sections with defaults, and a validation pass.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokenization_metrics::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("dashboards/commodities.yaml"))?;
//!
//! println!("cache ttl: {}s", config.cache.ttl_secs);
//! ```

mod dashboard;
mod observability;
mod price_feed;
mod sources;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::DispatchConfig;
use crate::infrastructure::output::is_writable_table_name;

pub use dashboard::{
    DashboardDefinition, EnrichmentDefinition, KpiDefinition, MetricDefinition,
    ReconciledDefinition,
};
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use price_feed::PriceFeedConfig;
pub use sources::{CacheConfig, QueryConfig};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Price feed configuration.
    #[serde(default)]
    pub price_feed: PriceFeedConfig,
    /// Query source configuration.
    #[serde(default)]
    pub query: QueryConfig,
    /// Query cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Fetch dispatch configuration.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Directory the rendered tables are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Tables to render.
    #[serde(flatten)]
    pub dashboard: DashboardDefinition,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            price_feed: PriceFeedConfig::default(),
            query: QueryConfig::default(),
            cache: CacheConfig::default(),
            dispatch: DispatchConfig::default(),
            observability: ObservabilityConfig::default(),
            output_dir: default_output_dir(),
            dashboard: DashboardDefinition::default(),
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to [`DEFAULT_CONFIG_PATH`].
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset or empty
/// variables without a default become empty strings.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |message: String| -> Result<(), ConfigError> {
        Err(ConfigError::ValidationError(message))
    };

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        return invalid("cache.ttl_secs must be positive when the cache is enabled".to_string());
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return invalid(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        ));
    }

    if !config.dashboard.enrichment.is_empty() {
        if config.price_feed.base_url.trim().is_empty() {
            return invalid("price_feed.base_url is required for enrichment".to_string());
        }
        if config.price_feed.timeout_secs == 0 {
            return invalid("price_feed.timeout_secs must be positive".to_string());
        }
    }

    let mut names = HashSet::new();
    for name in config.dashboard.all_names() {
        if name.trim().is_empty() {
            return invalid("table names must not be empty".to_string());
        }
        if !names.insert(name) {
            return invalid(format!("duplicate table name '{name}'"));
        }
        if !is_writable_table_name(name) {
            return invalid(format!(
                "table name '{name}' is reserved or contains a path separator"
            ));
        }
    }

    for metric in &config.dashboard.metrics {
        if metric.series.metrics.is_empty() {
            return invalid(format!(
                "metric '{}' must name at least one metric column",
                metric.name
            ));
        }
        if metric.kpi.as_ref().is_some_and(|k| k.window == Some(0)) {
            return invalid(format!("metric '{}' has a zero kpi window", metric.name));
        }
    }

    for enrichment in &config.dashboard.enrichment {
        if enrichment.assets.is_empty() {
            return invalid(format!(
                "enrichment '{}' must list at least one asset",
                enrichment.name
            ));
        }
        let mut outputs = HashSet::new();
        for asset in &enrichment.assets {
            let column = asset.usd_column();
            if column == enrichment.total_column || !outputs.insert(column.clone()) {
                return invalid(format!(
                    "enrichment '{}' produces column '{column}' more than once",
                    enrichment.name
                ));
            }
        }
    }

    let fetched: HashSet<&str> = config.dashboard.fetched_names().collect();
    for reconciled in &config.dashboard.reconciled {
        if reconciled.sources.len() < 2 {
            return invalid(format!(
                "reconciled table '{}' needs at least two sources",
                reconciled.name
            ));
        }
        if let Some(unknown) = reconciled
            .sources
            .iter()
            .find(|s| !fetched.contains(s.as_str()))
        {
            return invalid(format!(
                "reconciled table '{}' references unknown source '{unknown}'",
                reconciled.name
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::PeriodUnit;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(config.cache.enabled);
        assert_eq!(config.query.data_dir, "data");
        assert_eq!(config.output_dir, "output");
        assert_eq!(config.price_feed.base_url, "https://indexer.vestige.fi");
        assert_eq!(config.observability.logging.format, "json");
        assert!(config.dashboard.metrics.is_empty());
    }

    #[test]
    fn test_load_minimal_config() {
        let config = match load_config_from_string("output_dir: out\n") {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };
        assert_eq!(config.output_dir, "out");
        assert_eq!(config.dispatch.max_workers, 0);
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r"
cache:
  ttl_secs: 600
dispatch:
  max_workers: 4
  task_timeout_secs: 120
observability:
  logging:
    level: debug
    format: pretty
metrics:
  - name: card_transactions
    query: select mt, monthly_transactions from card
    series:
      key: mt
      unit: month
      metrics: [monthly_transactions]
  - name: tvl
    query: select date, tvl from lending
    series:
      key: date
      unit: day
      metrics: [tvl]
      cumulative: false
  - name: no_borrows
    query: select date, no_borrows from lending
    series:
      unit: day
      metrics: [no_borrows]
      cumulative: false
reconciled:
  - name: lending
    sources: [tvl, no_borrows]
";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.dispatch.max_workers, 4);
        assert_eq!(config.dashboard.metrics.len(), 3);
        assert_eq!(config.dashboard.metrics[1].series.unit, PeriodUnit::Day);
        assert_eq!(config.dashboard.reconciled[0].sources, ["tvl", "no_borrows"]);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "query:\n  data_dir: /srv/results").unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.query.data_dir, "/srv/results");
    }

    #[test]
    fn test_example_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.yaml");
        let config = load_config(Some(path)).unwrap();

        assert_eq!(config.dashboard.metrics.len(), 4);
        assert_eq!(config.dashboard.enrichment[0].assets.len(), 2);
        assert_eq!(config.dashboard.reconciled[0].rule.outputs.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let Err(err) = load_config(Some("/nonexistent/metrics.yaml")) else {
            panic!("expected read error");
        };
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "data_dir: ${TOKENIZATION_METRICS_TEST_NONEXISTENT_VAR:-data}";
        assert_eq!(interpolate_env_vars(input), "data_dir: data");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        // PATH should always exist
        let result = interpolate_env_vars("path: ${PATH:-default}");
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "base_url: ${TOKENIZATION_METRICS_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "base_url: ");
    }

    #[test]
    fn test_validation_duplicate_names() {
        let yaml = r"
metrics:
  - name: tvl
    query: q1
    series: { metrics: [tvl] }
  - name: tvl
    query: q2
    series: { metrics: [tvl] }
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for duplicate names");
        };
        assert!(err.to_string().contains("duplicate table name 'tvl'"));
    }

    #[test]
    fn test_validation_unknown_reconcile_source() {
        let yaml = r"
metrics:
  - name: tvl
    query: q1
    series: { metrics: [tvl] }
reconciled:
  - name: lending
    sources: [tvl, borrows]
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for unknown source");
        };
        assert!(err.to_string().contains("unknown source 'borrows'"));
    }

    #[test]
    fn test_validation_log_format() {
        let yaml = r"
observability:
  logging:
    format: xml
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for log format");
        };
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn test_validation_zero_ttl() {
        let Err(err) = load_config_from_string("cache:\n  ttl_secs: 0\n") else {
            panic!("expected error for zero ttl");
        };
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validation_unwritable_table_names() {
        for name in ["_report", "../x"] {
            let yaml = format!(
                "metrics:\n  - name: '{name}'\n    query: q1\n    series: {{ metrics: [tvl] }}\n"
            );
            let Err(err) = load_config_from_string(&yaml) else {
                panic!("expected error for table name {name}");
            };
            assert!(err.to_string().contains("reserved or contains a path separator"));
        }
    }

    #[test]
    fn test_validation_duplicate_asset_display_names() {
        let yaml = r"
price_feed:
  base_url: http://localhost
enrichment:
  - name: commodities
    query: q1
    assets:
      - { column_name: supply_gold, asset_identifier: '1', asset_display_name: gold }
      - { column_name: supply_silver, asset_identifier: '2', asset_display_name: gold }
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for duplicate display names");
        };
        assert!(err.to_string().contains("'gold_usd' more than once"));

        let clash = r"
price_feed:
  base_url: http://localhost
enrichment:
  - name: commodities
    query: q1
    assets:
      - { column_name: supply_gold, asset_identifier: '1', asset_display_name: total }
";
        let Err(err) = load_config_from_string(clash) else {
            panic!("expected error for display name equal to the total column");
        };
        assert!(err.to_string().contains("'total_usd' more than once"));
    }
}
