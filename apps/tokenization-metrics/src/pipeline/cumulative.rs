//! Running totals over a period-ordered table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Table, Value};
use crate::error::PipelineError;

/// Which metric to cumulate and where to store the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeSpec {
    /// Source metric column.
    pub metric: String,
    /// Output column name.
    pub output: String,
}

impl CumulativeSpec {
    /// Cumulate `metric` into `cumulative_<metric>`.
    pub fn new(metric: impl Into<String>) -> Self {
        let metric = metric.into();
        let output = format!("cumulative_{metric}");
        Self { metric, output }
    }

    /// Cumulate `metric` into a custom column (e.g. `total_transactions`).
    pub fn named(metric: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            output: output.into(),
        }
    }
}

/// Add a running-sum column for each spec.
///
/// The table must already be gap-filled: period keys strictly ascending with
/// no repeats. The sum at row `i` covers rows `0..=i`.
pub fn add_cumulative(
    table: &Table,
    key: &str,
    specs: &[CumulativeSpec],
) -> Result<Table, PipelineError> {
    let periods = table.date_column(key)?;
    if let Some(position) = periods.windows(2).position(|w| w[0] >= w[1]) {
        return Err(PipelineError::UnorderedOrDuplicateKey {
            column: key.to_string(),
            position: position + 1,
        });
    }

    let mut out = table.clone();
    for spec in specs {
        let values = table.numeric_column(&spec.metric)?;
        let running = values
            .iter()
            .scan(Decimal::ZERO, |total, v| {
                *total += v;
                Some(Value::Number(*total))
            })
            .collect();
        out = out.with_column(spec.output.clone(), running)?;
    }

    debug!(
        key = key,
        rows = table.len(),
        metrics = specs.len(),
        "Added cumulative columns"
    );
    Ok(out)
}

/// [`add_cumulative`] with default `cumulative_<metric>` names.
pub fn add_cumulative_columns(
    table: &Table,
    key: &str,
    metrics: &[&str],
) -> Result<Table, PipelineError> {
    let specs = metrics
        .iter()
        .map(|m| CumulativeSpec::new(*m))
        .collect::<Vec<_>>();
    add_cumulative(table, key, &specs)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::pipeline::normalize_rows;

    fn monthly(values: &[i64]) -> Table {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                vec![
                    Value::Text(format!("{}-{:02}-01", 2020 + i / 12, i % 12 + 1)),
                    Value::from(*v),
                ]
            })
            .collect();
        normalize_rows(rows, &["period", "count"]).unwrap()
    }

    #[test]
    fn test_running_sum() {
        let out = add_cumulative_columns(&monthly(&[10, 0, 5]), "period", &["count"]).unwrap();
        assert_eq!(out.columns(), ["period", "count", "cumulative_count"]);
        assert_eq!(
            out.numeric_column("cumulative_count").unwrap(),
            vec![dec!(10), dec!(10), dec!(15)]
        );
    }

    #[test]
    fn test_named_output() {
        let out = add_cumulative(
            &monthly(&[1, 2]),
            "period",
            &[CumulativeSpec::named("count", "total_count")],
        )
        .unwrap();
        assert_eq!(
            out.numeric_column("total_count").unwrap(),
            vec![dec!(1), dec!(3)]
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let table = normalize_rows(
            vec![
                vec![Value::from("2024-01-01"), Value::from(1)],
                vec![Value::from("2024-01-01"), Value::from(2)],
            ],
            &["period", "count"],
        )
        .unwrap();
        let err = add_cumulative_columns(&table, "period", &["count"]).unwrap_err();
        assert_eq!(
            err,
            PipelineError::UnorderedOrDuplicateKey {
                column: "period".to_string(),
                position: 1
            }
        );
    }

    #[test]
    fn test_unordered_key_rejected() {
        let table = normalize_rows(
            vec![
                vec![Value::from("2024-01-01"), Value::from(1)],
                vec![Value::from("2024-03-01"), Value::from(2)],
                vec![Value::from("2024-02-01"), Value::from(2)],
            ],
            &["period", "count"],
        )
        .unwrap();
        assert!(matches!(
            add_cumulative_columns(&table, "period", &["count"]),
            Err(PipelineError::UnorderedOrDuplicateKey { position: 2, .. })
        ));
    }

    #[test]
    fn test_empty_table_gets_empty_column() {
        let table = Table::empty(["period", "count"]).unwrap();
        let out = add_cumulative_columns(&table, "period", &["count"]).unwrap();
        assert!(out.has_column("cumulative_count"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let table = monthly(&[3, 1, 4, 1, 5]);
        let first = add_cumulative_columns(&table, "period", &["count"]).unwrap();
        let second = add_cumulative_columns(&table, "period", &["count"]).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn cumulative_is_prefix_sum(values in proptest::collection::vec(0i64..10_000, 0..60)) {
            let out = add_cumulative_columns(&monthly(&values), "period", &["count"]).unwrap();
            let cumulative = out.numeric_column("cumulative_count").unwrap();

            for (i, total) in cumulative.iter().enumerate() {
                let expected: i64 = values[..=i].iter().sum();
                prop_assert_eq!(*total, Decimal::from(expected));
            }
            prop_assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
