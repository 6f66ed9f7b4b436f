//! Chart-contract shaping for metric series.
//!
//! Chart builders expect `period`, the metric columns, and optionally a
//! `cumulative_<metric>` column per metric, with no missing periods.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cumulative::{CumulativeSpec, add_cumulative};
use super::gap_fill::{SpineBounds, fill_gaps};
use crate::domain::{PeriodUnit, Table};
use crate::error::PipelineError;

/// Name of the key column in every shaped series.
pub const PERIOD_COLUMN: &str = "period";

fn default_key() -> String {
    "date".to_string()
}

const fn default_true() -> bool {
    true
}

/// How to turn a raw query table into a chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSeriesSpec {
    /// Period key column in the raw table.
    #[serde(default = "default_key")]
    pub key: String,
    /// Granularity of the output.
    #[serde(default)]
    pub unit: PeriodUnit,
    /// Metric columns to keep, in output order.
    pub metrics: Vec<String>,
    /// Whether to add `cumulative_<metric>` columns.
    #[serde(default = "default_true")]
    pub cumulative: bool,
    /// Extend the spine to the render date.
    #[serde(default)]
    pub through_today: bool,
}

impl MetricSeriesSpec {
    /// Monthly series of one metric keyed on `key`, with its cumulative.
    pub fn monthly(key: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            unit: PeriodUnit::Month,
            metrics: vec![metric.into()],
            cumulative: true,
            through_today: false,
        }
    }

    /// Gap-fill, select and rename, then add running totals.
    ///
    /// `today` only matters when `through_today` is set.
    pub fn build(&self, table: &Table, today: NaiveDate) -> Result<Table, PipelineError> {
        let bounds = if self.through_today {
            SpineBounds::ExtendTo(today)
        } else {
            SpineBounds::Observed
        };
        let filled = fill_gaps(table, &self.key, self.unit, bounds)?;

        let mut columns = vec![self.key.as_str()];
        columns.extend(self.metrics.iter().map(String::as_str));
        let shaped = filled
            .select(&columns)?
            .rename_column(&self.key, PERIOD_COLUMN)?;

        if !self.cumulative {
            return Ok(shaped);
        }
        let specs = self
            .metrics
            .iter()
            .map(CumulativeSpec::new)
            .collect::<Vec<_>>();
        add_cumulative(&shaped, PERIOD_COLUMN, &specs)
    }
}

/// Monthly `period`, `<metric>`, `cumulative_<metric>` series.
pub fn monthly_series(table: &Table, key: &str, metric: &str) -> Result<Table, PipelineError> {
    MetricSeriesSpec::monthly(key, metric).build(table, chrono::Utc::now().date_naive())
}
