//! Dashboard definitions: which tables to build and how.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::ports::QueryRequest;
use crate::pipeline::{AssetColumn, DEFAULT_TOTAL_COLUMN, MetricSeriesSpec, ReconcileRule};

/// Every table rendered in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardDefinition {
    /// Query-backed metric series.
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
    /// Query-backed quantity tables priced in USD.
    #[serde(default)]
    pub enrichment: Vec<EnrichmentDefinition>,
    /// Tables derived from other tables of the same cycle.
    #[serde(default)]
    pub reconciled: Vec<ReconciledDefinition>,
}

impl DashboardDefinition {
    /// Names of every fetched table (metrics and enrichment).
    pub fn fetched_names(&self) -> impl Iterator<Item = &str> {
        self.metrics
            .iter()
            .map(|m| m.name.as_str())
            .chain(self.enrichment.iter().map(|e| e.name.as_str()))
    }

    /// Names of every output table.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.fetched_names()
            .chain(self.reconciled.iter().map(|r| r.name.as_str()))
    }
}

/// A chart series backed by one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Output table name.
    pub name: String,
    /// Query text.
    pub query: String,
    /// Query parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// How the raw result is shaped.
    pub series: MetricSeriesSpec,
    /// Headline value computed from the shaped series.
    #[serde(default)]
    pub kpi: Option<KpiDefinition>,
}

impl MetricDefinition {
    /// Query request for this metric.
    #[must_use]
    pub fn request(&self) -> QueryRequest {
        QueryRequest {
            name: self.name.clone(),
            query: self.query.clone(),
            params: self.params.clone(),
        }
    }
}

/// Headline value of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiDefinition {
    /// Column of the shaped series.
    pub column: String,
    /// Compare the last row with the row this many positions earlier.
    #[serde(default = "default_rows_back")]
    pub rows_back: usize,
    /// Compare trailing sums of this many rows instead.
    #[serde(default)]
    pub window: Option<usize>,
}

const fn default_rows_back() -> usize {
    1
}

/// A quantity table priced through the price feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentDefinition {
    /// Output table name.
    pub name: String,
    /// Query text.
    pub query: String,
    /// Query parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Date column of the query result.
    #[serde(default = "default_key")]
    pub key: String,
    /// Name of the cross-asset total column.
    #[serde(default = "default_total_column")]
    pub total_column: String,
    /// Quantity column to asset mapping.
    pub assets: Vec<AssetColumn>,
}

impl EnrichmentDefinition {
    /// Query request for this table.
    #[must_use]
    pub fn request(&self) -> QueryRequest {
        QueryRequest {
            name: self.name.clone(),
            query: self.query.clone(),
            params: self.params.clone(),
        }
    }
}

fn default_key() -> String {
    "date".to_string()
}

fn default_total_column() -> String {
    DEFAULT_TOTAL_COLUMN.to_string()
}

/// A table joined from other tables of the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledDefinition {
    /// Output table name.
    pub name: String,
    /// Names of metric or enrichment tables to join.
    pub sources: Vec<String>,
    /// Shared period key column.
    #[serde(default = "default_period_key")]
    pub key: String,
    /// Derived columns.
    #[serde(default)]
    pub rule: ReconcileRule,
    /// Columns of the result to add running totals for.
    #[serde(default)]
    pub cumulative: Vec<String>,
}

fn default_period_key() -> String {
    crate::pipeline::PERIOD_COLUMN.to_string()
}
