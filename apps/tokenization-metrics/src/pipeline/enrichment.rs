//! Price enrichment: token quantities into USD series.
//!
//! Each quantity column is tied to an external asset through an explicit
//! [`AssetColumn`] schema. Daily closes are fetched per asset, carried
//! forward over dates the provider skipped (weekends, holidays) and
//! multiplied into `<display_name>_usd`. A running total across all priced
//! assets is written alongside.
//!
//! Fetch failures never abort enrichment. A failed asset is left out of the
//! total and reported in [`EnrichmentReport::failures`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::application::ports::{PriceFeedError, PriceFeedPort};
use crate::domain::{PriceSeries, Table, Value};
use crate::error::PipelineError;

/// Default name of the cross-asset total column.
pub const DEFAULT_TOTAL_COLUMN: &str = "total_usd";

/// Links a quantity column to the asset it measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetColumn {
    /// Quantity column in the input table.
    pub column_name: String,
    /// Identifier understood by the price feed.
    pub asset_identifier: String,
    /// Label used for the output column.
    pub asset_display_name: String,
}

impl AssetColumn {
    /// Schema row for one asset.
    pub fn new(
        column_name: impl Into<String>,
        asset_identifier: impl Into<String>,
        asset_display_name: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            asset_identifier: asset_identifier.into(),
            asset_display_name: asset_display_name.into(),
        }
    }

    /// Name of the USD column produced for this asset.
    #[must_use]
    pub fn usd_column(&self) -> String {
        format!("{}_usd", self.asset_display_name)
    }
}

/// An asset that could not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    /// Quantity column left unpriced.
    pub column: String,
    /// Asset identifier that failed.
    pub asset_identifier: String,
    /// Last error returned by the feed.
    #[serde(serialize_with = "serialize_display")]
    pub error: PriceFeedError,
}

fn serialize_display<S: Serializer>(err: &PriceFeedError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Enriched table plus per-asset failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    /// Input columns, one `<display_name>_usd` column per priced asset and
    /// the total column.
    pub table: Table,
    /// Assets excluded from the total.
    pub failures: Vec<AssetFailure>,
    /// Number of assets priced successfully.
    pub priced_assets: usize,
}

impl EnrichmentReport {
    /// Whether every asset was priced.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Waits between a rate-limited attempt and its retry.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Multiplies quantity columns by forward-filled daily closes.
pub struct PriceEnricher<P: ?Sized> {
    feed: Arc<P>,
    sleeper: Arc<dyn Sleeper>,
    key: String,
    total_column: String,
}

impl<P: PriceFeedPort + ?Sized> PriceEnricher<P> {
    /// Enricher keyed on `date`, writing totals to [`DEFAULT_TOTAL_COLUMN`].
    pub fn new(feed: Arc<P>) -> Self {
        Self {
            feed,
            sleeper: Arc::new(TokioSleeper),
            key: "date".to_string(),
            total_column: DEFAULT_TOTAL_COLUMN.to_string(),
        }
    }

    /// Use another date column.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Use another total column name (e.g. `total_mcap_usd`).
    #[must_use]
    pub fn with_total_column(mut self, name: impl Into<String>) -> Self {
        self.total_column = name.into();
        self
    }

    /// Replace the rate-limit sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Price every asset in `assets` over the table's date range.
    ///
    /// Schema problems (missing key or quantity column, non-numeric
    /// quantities, empty table, clashing output columns) are returned as
    /// errors before any fetch.
    pub async fn enrich(
        &self,
        table: &Table,
        assets: &[AssetColumn],
    ) -> Result<EnrichmentReport, PipelineError> {
        let dates = table.date_column(&self.key)?;
        let (Some(start), Some(end)) = (dates.iter().min().copied(), dates.iter().max().copied())
        else {
            return Err(PipelineError::EmptySeries {
                column: self.key.clone(),
            });
        };

        let quantities = assets
            .iter()
            .map(|asset| table.numeric_column(&asset.column_name))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_output_columns(table, assets)?;

        let mut out = table.clone();
        let mut total = vec![Decimal::ZERO; table.len()];
        let mut failures = Vec::new();
        let mut priced_assets = 0usize;

        for (asset, quantity) in assets.iter().zip(&quantities) {
            match self.fetch(asset, start, end).await {
                Ok(series) => {
                    let usd = usd_values(&dates, quantity, &series);
                    for (sum, value) in total.iter_mut().zip(&usd) {
                        *sum += value.numeric_or_zero().unwrap_or_default();
                    }
                    out = out.with_column(asset.usd_column(), usd)?;
                    priced_assets += 1;
                    debug!(
                        asset = %asset.asset_identifier,
                        column = %asset.column_name,
                        closes = series.len(),
                        "Priced asset"
                    );
                }
                Err(error) => {
                    warn!(
                        asset = %asset.asset_identifier,
                        column = %asset.column_name,
                        error = %error,
                        "Failed to price asset, excluding it from the total"
                    );
                    failures.push(AssetFailure {
                        column: asset.column_name.clone(),
                        asset_identifier: asset.asset_identifier.clone(),
                        error,
                    });
                }
            }
        }

        let out = out.with_column(
            self.total_column.clone(),
            total.into_iter().map(Value::Number).collect(),
        )?;

        info!(
            assets = assets.len(),
            priced = priced_assets,
            failed = failures.len(),
            %start,
            %end,
            "Price enrichment complete"
        );

        Ok(EnrichmentReport {
            table: out,
            failures,
            priced_assets,
        })
    }

    /// Every USD column and the total column must be new and distinct.
    fn check_output_columns(
        &self,
        table: &Table,
        assets: &[AssetColumn],
    ) -> Result<(), PipelineError> {
        let mut seen = HashSet::new();
        let outputs = assets
            .iter()
            .map(AssetColumn::usd_column)
            .chain(std::iter::once(self.total_column.clone()));
        for name in outputs {
            if table.columns().contains(&name) {
                return Err(PipelineError::schema(format!(
                    "enrichment output '{name}' already exists in the input table"
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(PipelineError::schema(format!(
                    "enrichment output '{name}' is produced more than once"
                )));
            }
        }
        Ok(())
    }

    async fn fetch(
        &self,
        asset: &AssetColumn,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceFeedError> {
        match self
            .feed
            .daily_closes(&asset.asset_identifier, start, end)
            .await
        {
            Err(PriceFeedError::RateLimited { retry_after }) => {
                warn!(
                    asset = %asset.asset_identifier,
                    retry_after_secs = retry_after.as_secs(),
                    "Price feed rate limited, retrying once"
                );
                self.sleeper.sleep(retry_after).await;
                self.feed
                    .daily_closes(&asset.asset_identifier, start, end)
                    .await
            }
            other => other,
        }
    }
}

/// `quantity * close` per row, the close carried forward from the last
/// observation. Rows before the first observation have no price.
fn usd_values(dates: &[NaiveDate], quantity: &[Decimal], series: &PriceSeries) -> Vec<Value> {
    dates
        .iter()
        .zip(quantity)
        .map(|(date, qty)| {
            series
                .close_at_or_before(*date)
                .map_or(Value::Null, |close| Value::Number(qty * close))
        })
        .collect()
}
