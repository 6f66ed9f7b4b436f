//! Gap fill and period spine construction.
//!
//! Query engines only return periods that had activity. Charts need a dense
//! axis, so every series is left-joined onto a synthetic spine of periods with
//! zero substituted where nothing matched.
//!
//! Rows that land in the same period (daily keys on a monthly spine, or
//! duplicate rows from a union query) are summed before the join, so no row
//! silently overwrites another.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PeriodUnit, Table, Value};
use crate::error::PipelineError;

/// Range covered by the generated spine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpineBounds {
    /// From the table's earliest to its latest period.
    #[default]
    Observed,
    /// Fixed range. Source rows outside it are dropped.
    Explicit {
        /// First period (truncated to the unit).
        min: NaiveDate,
        /// Last period (truncated to the unit).
        max: NaiveDate,
    },
    /// From the table's earliest period through the later of its latest
    /// period and the given date.
    ExtendTo(NaiveDate),
}

impl SpineBounds {
    /// Extend the observed range to the current UTC date.
    #[must_use]
    pub fn through_today() -> Self {
        Self::ExtendTo(Utc::now().date_naive())
    }
}

/// Dense, ascending, one-row-per-period copy of `table`.
///
/// The key column keeps its position and is emitted as dates truncated to
/// `unit`. Non-key columns of periods without source rows are zero.
pub fn fill_gaps(
    table: &Table,
    key: &str,
    unit: PeriodUnit,
    bounds: SpineBounds,
) -> Result<Table, PipelineError> {
    let key_idx = table.column_index(key)?;
    if table.is_empty() {
        return Err(PipelineError::EmptySeries {
            column: key.to_string(),
        });
    }

    let periods = table.date_column(key)?;
    let width = table.columns().len() - 1;

    let mut by_period: BTreeMap<NaiveDate, Vec<Value>> = BTreeMap::new();
    let mut merged = 0usize;
    for (date, row) in periods.iter().zip(table.rows()) {
        let cells = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_idx)
            .map(|(_, v)| v.clone());
        match by_period.entry(unit.truncate(*date)) {
            Entry::Vacant(slot) => {
                slot.insert(cells.collect());
            }
            Entry::Occupied(mut slot) => {
                merged += 1;
                for (existing, incoming) in slot.get_mut().iter_mut().zip(cells) {
                    *existing = merge_cells(existing, incoming);
                }
            }
        }
    }

    let (observed_min, observed_max) = match (by_period.keys().next(), by_period.keys().next_back())
    {
        (Some(min), Some(max)) => (*min, *max),
        _ => {
            return Err(PipelineError::EmptySeries {
                column: key.to_string(),
            });
        }
    };

    let (min, max) = match bounds {
        SpineBounds::Observed => (observed_min, observed_max),
        SpineBounds::Explicit { min, max } => {
            if min > max {
                return Err(PipelineError::InvalidBounds {
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
            (unit.truncate(min), unit.truncate(max))
        }
        SpineBounds::ExtendTo(until) => (observed_min, observed_max.max(unit.truncate(until))),
    };

    let spine = unit.spine(min, max);
    let dropped = by_period
        .keys()
        .filter(|period| **period < min || **period > max)
        .count();

    let rows = spine
        .iter()
        .map(|period| {
            let mut row = by_period
                .get(period)
                .cloned()
                .unwrap_or_else(|| vec![Value::Number(Decimal::ZERO); width]);
            row.insert(key_idx, Value::Date(*period));
            row
        })
        .collect();

    debug!(
        key = key,
        unit = %unit,
        source_rows = table.len(),
        merged_rows = merged,
        dropped_rows = dropped,
        periods = spine.len(),
        "Filled period gaps"
    );

    Table::new(table.columns().to_vec(), rows)
}

/// Combine two cells of the same period: numbers add, nulls yield to the
/// other side, anything else keeps the first value seen.
fn merge_cells(existing: &Value, incoming: Value) -> Value {
    match (existing, &incoming) {
        (Value::Null, _) => incoming,
        (_, Value::Null) => existing.clone(),
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        _ => existing.clone(),
    }
}
