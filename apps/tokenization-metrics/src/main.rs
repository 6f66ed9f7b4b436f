//! Tokenization Metrics Binary
//!
//! Runs one render cycle of the dashboard pipeline and writes the resulting
//! tables as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tokenization-metrics
//! ```
//!
//! # Environment Variables
//!
//! - `METRICS_CONFIG`: path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: log filter, overrides `observability.logging.level`
//!
//! Any `${VAR}` referenced by the config file can be set in `.env`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokenization_metrics::application::ports::{PriceFeedPort, QueryExecutor};
use tokenization_metrics::application::use_cases::RenderDashboard;
use tokenization_metrics::config::{Config, DEFAULT_CONFIG_PATH, load_config};
use tokenization_metrics::dispatch::FetchDispatcher;
use tokenization_metrics::infrastructure::output::write_render_output;
use tokenization_metrics::infrastructure::price_feed::CandlePriceFeed;
use tokenization_metrics::infrastructure::query::{CachedQueryExecutor, FileQueryExecutor};
use tokenization_metrics::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path =
        std::env::var("METRICS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(Some(&config_path))
        .with_context(|| format!("loading configuration from {config_path}"))?;
    init_tracing(&config.observability.logging)?;

    tracing::info!(
        config = %config_path,
        metrics = config.dashboard.metrics.len(),
        enrichment = config.dashboard.enrichment.len(),
        reconciled = config.dashboard.reconciled.len(),
        "Starting Tokenization Metrics"
    );

    let executor = create_query_executor(&config);
    let feed: Arc<dyn PriceFeedPort> = Arc::new(
        CandlePriceFeed::new(&config.price_feed).context("creating price feed client")?,
    );
    let dispatcher = FetchDispatcher::new(config.dispatch.clone());

    let output = RenderDashboard::new(executor, feed, dispatcher)
        .execute(&config.dashboard)
        .await;

    let written = write_render_output(Path::new(&config.output_dir), &output).await?;
    tracing::info!(
        output_dir = %config.output_dir,
        files = written.len(),
        complete = output.is_complete(),
        "Render output written"
    );

    for (name, failure) in &output.failures {
        tracing::warn!(table = %name, error = %failure.error, "Not rendered");
    }
    for (table, failures) in &output.asset_failures {
        for failure in failures {
            tracing::warn!(
                table = %table,
                asset = %failure.asset_identifier,
                error = %failure.error,
                "Asset not priced"
            );
        }
    }

    Ok(())
}

fn create_query_executor(config: &Config) -> Arc<dyn QueryExecutor> {
    let files = FileQueryExecutor::new(&config.query.data_dir);
    if config.cache.enabled {
        Arc::new(CachedQueryExecutor::new(
            files,
            Duration::from_secs(config.cache.ttl_secs),
        ))
    } else {
        Arc::new(files)
    }
}

/// Load `.env` from the working directory or the nearest ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
