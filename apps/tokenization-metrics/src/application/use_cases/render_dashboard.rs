//! Render Dashboard Use Case
//!
//! One render cycle: fetch and shape every configured table concurrently,
//! derive the reconciled tables, then compute headline KPIs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::application::ports::{PriceFeedPort, QueryExecutor};
use crate::config::{
    DashboardDefinition, EnrichmentDefinition, KpiDefinition, MetricDefinition,
    ReconciledDefinition,
};
use crate::dispatch::{FetchDispatcher, FetchFailure, FetchFuture, FetchOutcome, FetchTasks};
use crate::domain::Table;
use crate::pipeline::{
    AssetFailure, Kpi, PriceEnricher, Sleeper, TokioSleeper, add_cumulative_columns,
    latest_vs_lookback, reconcile, trailing_window,
};

type AssetFailures = Arc<Mutex<BTreeMap<String, Vec<AssetFailure>>>>;

/// Everything produced by one render cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderOutput {
    /// Rendered tables by name.
    pub tables: BTreeMap<String, Table>,
    /// Tables that could not be produced, plus KPI errors under `<name>.kpi`.
    pub failures: BTreeMap<String, FetchFailure>,
    /// Assets left unpriced, by enrichment table.
    pub asset_failures: BTreeMap<String, Vec<AssetFailure>>,
    /// Headline values by metric name.
    pub kpis: BTreeMap<String, Kpi>,
    /// Wall time of the cycle in milliseconds.
    pub elapsed_ms: u64,
}

impl RenderOutput {
    /// Whether every table, asset and KPI was produced.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.asset_failures.is_empty()
    }

    /// Summary without the table bodies.
    #[must_use]
    pub fn report(&self) -> RenderReport<'_> {
        RenderReport {
            rendered: self.tables.keys().map(String::as_str).collect(),
            failures: &self.failures,
            asset_failures: &self.asset_failures,
            kpis: self
                .kpis
                .iter()
                .map(|(name, kpi)| {
                    (
                        name.as_str(),
                        KpiReport {
                            display: kpi.display_value(),
                            change_percent: kpi.change.as_percent(),
                            kpi,
                        },
                    )
                })
                .collect(),
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Serializable cycle summary.
#[derive(Debug, Serialize)]
pub struct RenderReport<'a> {
    /// Names of the rendered tables.
    pub rendered: Vec<&'a str>,
    /// Failed tables.
    pub failures: &'a BTreeMap<String, FetchFailure>,
    /// Unpriced assets.
    pub asset_failures: &'a BTreeMap<String, Vec<AssetFailure>>,
    /// KPIs with their display strings.
    pub kpis: BTreeMap<&'a str, KpiReport<'a>>,
    /// Wall time of the cycle in milliseconds.
    pub elapsed_ms: u64,
}

/// A KPI with its rendered forms.
#[derive(Debug, Serialize)]
pub struct KpiReport<'a> {
    /// Raw values.
    #[serde(flatten)]
    pub kpi: &'a Kpi,
    /// `latest` as `1.2M`-style text.
    pub display: String,
    /// Change in percent, two decimals.
    pub change_percent: Option<rust_decimal::Decimal>,
}

/// Use case rendering a dashboard definition.
pub struct RenderDashboard<Q: ?Sized, P: ?Sized> {
    executor: Arc<Q>,
    feed: Arc<P>,
    dispatcher: FetchDispatcher,
    sleeper: Arc<dyn Sleeper>,
    today: NaiveDate,
}

impl<Q, P> RenderDashboard<Q, P>
where
    Q: QueryExecutor + ?Sized + 'static,
    P: PriceFeedPort + ?Sized + 'static,
{
    /// Create a new use case rendering as of the current UTC date.
    pub fn new(executor: Arc<Q>, feed: Arc<P>, dispatcher: FetchDispatcher) -> Self {
        Self {
            executor,
            feed,
            dispatcher,
            sleeper: Arc::new(TokioSleeper),
            today: Utc::now().date_naive(),
        }
    }

    /// Render as of `today` (spines extended with `through_today`).
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Replace the rate-limit sleeper used by price enrichment.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run one render cycle.
    ///
    /// Never fails as a whole: every table that could not be produced is
    /// reported in [`RenderOutput::failures`] and the rest are returned.
    pub async fn execute(&self, dashboard: &DashboardDefinition) -> RenderOutput {
        let start = Instant::now();
        let asset_failures: AssetFailures = Arc::default();

        let mut tasks = FetchTasks::new();
        for metric in &dashboard.metrics {
            tasks.insert(metric.name.clone(), self.metric_task(metric));
        }
        for enrichment in &dashboard.enrichment {
            tasks.insert(
                enrichment.name.clone(),
                self.enrichment_task(enrichment, Arc::clone(&asset_failures)),
            );
        }

        info!(
            tasks = tasks.len(),
            reconciled = dashboard.reconciled.len(),
            today = %self.today,
            "Starting render cycle"
        );
        let report = self.dispatcher.run(tasks).await;

        let mut output = RenderOutput::default();
        for (name, outcome) in report.outcomes {
            match outcome {
                FetchOutcome::Success { table } => {
                    output.tables.insert(name, table);
                }
                FetchOutcome::Failure(failure) => {
                    warn!(table = %name, error = %failure.error, "Table not rendered");
                    output.failures.insert(name, failure);
                }
            }
        }
        output.asset_failures = std::mem::take(&mut *asset_failures.lock());

        for definition in &dashboard.reconciled {
            match build_reconciled(definition, &output.tables) {
                Ok(table) => {
                    output.tables.insert(definition.name.clone(), table);
                }
                Err(err) => {
                    warn!(table = %definition.name, error = %err, "Reconciled table not rendered");
                    output
                        .failures
                        .insert(definition.name.clone(), FetchFailure::from_error(&err));
                }
            }
        }

        for metric in &dashboard.metrics {
            let (Some(kpi), Some(table)) = (&metric.kpi, output.tables.get(&metric.name)) else {
                continue;
            };
            match compute_kpi(table, kpi) {
                Ok(value) => {
                    output.kpis.insert(metric.name.clone(), value);
                }
                Err(err) => {
                    warn!(metric = %metric.name, error = %err, "KPI not computed");
                    output.failures.insert(
                        format!("{}.kpi", metric.name),
                        FetchFailure::from_error(&err),
                    );
                }
            }
        }

        output.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            rendered = output.tables.len(),
            failed = output.failures.len(),
            unpriced_tables = output.asset_failures.len(),
            kpis = output.kpis.len(),
            elapsed_ms = output.elapsed_ms,
            "Render cycle complete"
        );
        output
    }

    fn metric_task(&self, metric: &MetricDefinition) -> FetchFuture {
        let executor = Arc::clone(&self.executor);
        let request = metric.request();
        let series = metric.series.clone();
        let today = self.today;
        async move {
            let raw = executor.execute(&request).await?.into_table()?;
            Ok(series.build(&raw, today)?)
        }
        .boxed()
    }

    fn enrichment_task(
        &self,
        enrichment: &EnrichmentDefinition,
        asset_failures: AssetFailures,
    ) -> FetchFuture {
        let executor = Arc::clone(&self.executor);
        let enricher = PriceEnricher::new(Arc::clone(&self.feed))
            .with_key(enrichment.key.clone())
            .with_total_column(enrichment.total_column.clone())
            .with_sleeper(Arc::clone(&self.sleeper));
        let request = enrichment.request();
        let assets = enrichment.assets.clone();
        let name = enrichment.name.clone();
        async move {
            let raw = executor.execute(&request).await?.into_table()?;
            let report = enricher.enrich(&raw, &assets).await?;
            if !report.failures.is_empty() {
                asset_failures.lock().insert(name, report.failures);
            }
            Ok(report.table)
        }
        .boxed()
    }
}

fn build_reconciled(
    definition: &ReconciledDefinition,
    tables: &BTreeMap<String, Table>,
) -> anyhow::Result<Table> {
    let sources = definition
        .sources
        .iter()
        .map(|source| {
            tables
                .get(source)
                .ok_or_else(|| anyhow!("source table '{source}' was not rendered"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let joined = reconcile(&sources, &definition.key, &definition.rule)?;
    if definition.cumulative.is_empty() {
        return Ok(joined);
    }
    let metrics: Vec<&str> = definition.cumulative.iter().map(String::as_str).collect();
    Ok(add_cumulative_columns(&joined, &definition.key, &metrics)?)
}

fn compute_kpi(table: &Table, kpi: &KpiDefinition) -> anyhow::Result<Kpi> {
    let value = match kpi.window {
        Some(window) => trailing_window(table, &kpi.column, window)?,
        None => latest_vs_lookback(table, &kpi.column, kpi.rows_back)?,
    };
    Ok(value)
}
