//! Row normalizer: raw query results into labeled tables.

use tracing::debug;

use crate::domain::{Table, Value};
use crate::error::PipelineError;

/// Label query rows with their column names.
///
/// Fails with [`PipelineError::SchemaMismatch`] when a row's arity differs
/// from the number of names, or when a name repeats.
pub fn normalize_rows<S: AsRef<str>>(
    rows: Vec<Vec<Value>>,
    column_names: &[S],
) -> Result<Table, PipelineError> {
    let columns = column_names
        .iter()
        .map(|c| c.as_ref().to_string())
        .collect::<Vec<_>>();
    let table = Table::new(columns, rows)?;
    debug!(
        rows = table.len(),
        columns = table.columns().len(),
        "Normalized query rows"
    );
    Ok(table)
}

/// Same as [`normalize_rows`] for rows decoded from JSON.
pub fn normalize_json_rows<S: AsRef<str>>(
    rows: &[Vec<serde_json::Value>],
    column_names: &[S],
) -> Result<Table, PipelineError> {
    let rows = rows
        .iter()
        .map(|row| row.iter().map(Value::from_json).collect())
        .collect();
    normalize_rows(rows, column_names)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_normalize_rows() {
        let table = normalize_rows(
            vec![
                vec![Value::from("2024-01-01"), Value::from(10)],
                vec![Value::from("2024-03-01"), Value::from(5)],
            ],
            &["date", "count"],
        )
        .unwrap();

        assert_eq!(table.columns(), ["date", "count"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "count"), Some(&Value::from(5)));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = normalize_rows(vec![vec![Value::from(1)]], &["date", "count"]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_no_rows_keeps_schema() {
        let table = normalize_rows(Vec::new(), &["mt", "transactions"]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn test_json_rows() {
        let rows = vec![vec![json!("2024-01-01"), json!(12.5), json!(null)]];
        let table = normalize_json_rows(&rows, &["date", "vol", "note"]).unwrap();
        assert!(table.get(0, "note").unwrap().is_null());
        assert_eq!(
            table.get(0, "vol").and_then(Value::as_decimal),
            Some(rust_decimal_macros::dec!(12.5))
        );
    }

    #[test]
    fn test_json_number_beyond_decimal_range_is_rejected() {
        let rows = vec![
            vec![json!("2024-01-01"), json!(1)],
            vec![json!("2024-01-02"), json!(1e30)],
        ];
        let table = normalize_json_rows(&rows, &["date", "vol"]).unwrap();
        let err = table.numeric_column("vol").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NonNumeric { ref column, position: 1, .. } if column == "vol"
        ));
    }
}
