//! Labeled tabular data.
//!
//! A [`Table`] is an ordered list of rows sharing one column schema. Tables are
//! value objects: every transformation returns a new table.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::value::Value;
use crate::error::PipelineError;

/// Ordered rows with a uniform, uniquely named column set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that names are unique and every row has one
    /// cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::schema(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }

        if let Some((position, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(PipelineError::schema(format!(
                "row {position} has {} values but {} columns were named",
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// A table with the given columns and no rows.
    pub fn empty<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
    ) -> Result<Self, PipelineError> {
        Self::new(columns.into_iter().map(Into::into).collect(), Vec::new())
    }

    /// Column names in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::column_not_found(name))
    }

    /// Cell at `row` in column `name`.
    #[must_use]
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, PipelineError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// A column read as numbers, `Null` counting as zero.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Decimal>, PipelineError> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(position, row)| {
                row[idx]
                    .numeric_or_zero()
                    .ok_or_else(|| PipelineError::NonNumeric {
                        column: name.to_string(),
                        position,
                        value: row[idx].to_string(),
                    })
            })
            .collect()
    }

    /// A column read as calendar dates.
    pub fn date_column(&self, name: &str) -> Result<Vec<NaiveDate>, PipelineError> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(position, row)| {
                row[idx]
                    .as_date()
                    .ok_or_else(|| PipelineError::InvalidPeriodKey {
                        column: name.to_string(),
                        position,
                        value: row[idx].to_string(),
                    })
            })
            .collect()
    }

    /// New table with `values` stored under `name`.
    ///
    /// An existing column of that name is replaced in place; otherwise the
    /// column is appended.
    pub fn with_column(
        &self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if values.len() != self.rows.len() {
            return Err(PipelineError::schema(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }

        let mut columns = self.columns.clone();
        let mut rows = self.rows.clone();
        match columns.iter().position(|c| *c == name) {
            Some(idx) => {
                for (row, value) in rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                columns.push(name);
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(Self { columns, rows })
    }

    /// New table holding only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Self, PipelineError> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>, _>>()?;
        let columns = names.iter().map(|n| (*n).to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Self::new(columns, rows)
    }

    /// New table with one column renamed.
    pub fn rename_column(&self, from: &str, to: &str) -> Result<Self, PipelineError> {
        let idx = self.column_index(from)?;
        let mut columns = self.columns.clone();
        columns[idx] = to.to_string();
        Self::new(columns, self.rows.clone())
    }

    /// Rows as JSON objects keyed by column name.
    #[must_use]
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, value)| {
                        (
                            name.clone(),
                            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect()
            })
            .collect()
    }
}
