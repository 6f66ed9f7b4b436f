//! Cross-source reconciliation.
//!
//! Several queries often describe one quantity from different angles: TVL
//! with and without borrows, per-chain volumes, mints and redemptions. The
//! reconciler full-outer-joins them on the period key and derives new columns
//! from a small expression language, e.g. `borrows = tvl - no_borrows`.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Table, Value};
use crate::error::PipelineError;

/// Row-wise arithmetic over joined columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Value of a column, zero where the source had no row.
    Column(String),
    /// Sum of all operands.
    Sum(Vec<Expr>),
    /// `a - b`.
    Difference(Box<Expr>, Box<Expr>),
    /// `a / b`, null when `b` is zero.
    Ratio(Box<Expr>, Box<Expr>),
    /// A literal.
    Constant(Decimal),
}

/// Shorthand for [`Expr::Column`].
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Shorthand for [`Expr::Sum`].
pub fn sum(operands: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Sum(operands.into_iter().collect())
}

/// Shorthand for [`Expr::Difference`].
pub fn diff(a: Expr, b: Expr) -> Expr {
    Expr::Difference(Box::new(a), Box::new(b))
}

/// Shorthand for [`Expr::Ratio`].
pub fn ratio(a: Expr, b: Expr) -> Expr {
    Expr::Ratio(Box::new(a), Box::new(b))
}

impl Expr {
    fn eval(&self, row: &HashMap<&str, Option<Decimal>>) -> Option<Decimal> {
        match self {
            Self::Column(name) => row.get(name.as_str()).copied().flatten(),
            Self::Sum(operands) => operands
                .iter()
                .try_fold(Decimal::ZERO, |acc, e| Some(acc + e.eval(row)?)),
            Self::Difference(a, b) => Some(a.eval(row)? - b.eval(row)?),
            Self::Ratio(a, b) => a.eval(row)?.checked_div(b.eval(row)?),
            Self::Constant(v) => Some(*v),
        }
    }

    fn referenced_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Column(name) => out.push(name),
            Self::Sum(operands) => operands.iter().for_each(|e| e.referenced_columns(out)),
            Self::Difference(a, b) | Self::Ratio(a, b) => {
                a.referenced_columns(out);
                b.referenced_columns(out);
            }
            Self::Constant(_) => {}
        }
    }
}

/// One derived column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    /// Column name in the reconciled table.
    pub name: String,
    /// Expression producing it.
    pub expr: Expr,
}

/// Ordered list of derived columns. Later outputs may reference earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRule {
    /// Outputs in evaluation order.
    #[serde(default)]
    pub outputs: Vec<OutputColumn>,
}

impl ReconcileRule {
    /// Empty rule: join only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an output column.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.outputs.push(OutputColumn {
            name: name.into(),
            expr,
        });
        self
    }
}

/// Join `tables` on `key` and evaluate `rule` on every period.
///
/// The result holds the union of all input periods in ascending order. Inputs
/// missing a period contribute zero to it.
pub fn reconcile(
    tables: &[&Table],
    key: &str,
    rule: &ReconcileRule,
) -> Result<Table, PipelineError> {
    if tables.len() < 2 {
        return Err(PipelineError::rule(format!(
            "at least two inputs are required, got {}",
            tables.len()
        )));
    }

    let mut metrics: Vec<String> = Vec::new();
    let mut by_period: BTreeMap<NaiveDate, Vec<Decimal>> = BTreeMap::new();

    for table in tables {
        let periods = table.date_column(key)?;
        let mut slots = Vec::new();
        let mut values = Vec::new();
        for name in table.columns().iter().filter(|c| c.as_str() != key) {
            let slot = metrics.iter().position(|m| m == name).unwrap_or_else(|| {
                metrics.push(name.clone());
                metrics.len() - 1
            });
            slots.push(slot);
            values.push(table.numeric_column(name)?);
        }

        for (row, period) in periods.iter().enumerate() {
            let cells = by_period.entry(*period).or_default();
            for (slot, column) in slots.iter().zip(&values) {
                if cells.len() <= *slot {
                    cells.resize(*slot + 1, Decimal::ZERO);
                }
                cells[*slot] += column[row];
            }
        }
    }

    validate_rule(rule, key, &metrics)?;

    let mut columns = Vec::with_capacity(1 + metrics.len() + rule.outputs.len());
    columns.push(key.to_string());
    columns.extend(metrics.iter().cloned());
    let output_slots: Vec<usize> = rule
        .outputs
        .iter()
        .map(|o| {
            columns.iter().position(|c| *c == o.name).unwrap_or_else(|| {
                columns.push(o.name.clone());
                columns.len() - 1
            })
        })
        .collect();

    let rows = by_period
        .into_iter()
        .map(|(period, mut cells)| {
            cells.resize(metrics.len(), Decimal::ZERO);
            let mut row = Vec::with_capacity(columns.len());
            row.push(Value::Date(period));
            row.extend(cells.iter().copied().map(Value::Number));
            row.resize(columns.len(), Value::Null);

            let mut scope: HashMap<&str, Option<Decimal>> = metrics
                .iter()
                .map(String::as_str)
                .zip(cells.iter().copied().map(Some))
                .collect();
            for (output, slot) in rule.outputs.iter().zip(&output_slots) {
                let value = output.expr.eval(&scope);
                scope.insert(output.name.as_str(), value);
                row[*slot] = value.map_or(Value::Null, Value::Number);
            }
            row
        })
        .collect::<Vec<_>>();

    debug!(
        key = key,
        inputs = tables.len(),
        periods = rows.len(),
        outputs = rule.outputs.len(),
        "Reconciled sources"
    );

    Table::new(columns, rows)
}

fn validate_rule(
    rule: &ReconcileRule,
    key: &str,
    metrics: &[String],
) -> Result<(), PipelineError> {
    let mut known: Vec<&str> = metrics.iter().map(String::as_str).collect();
    for output in &rule.outputs {
        if output.name == key {
            return Err(PipelineError::rule(format!(
                "output '{key}' would overwrite the period key"
            )));
        }
        let mut referenced = Vec::new();
        output.expr.referenced_columns(&mut referenced);
        if let Some(missing) = referenced.iter().find(|c| !known.contains(*c)) {
            return Err(PipelineError::rule(format!(
                "output '{}' references unknown column '{missing}'",
                output.name
            )));
        }
        known.push(&output.name);
    }
    Ok(())
}
