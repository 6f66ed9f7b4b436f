//! Query Executor Port (Driven Port)
//!
//! Interface to the analytical query engine that produces the raw metric
//! tables. The engine itself lives outside this crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Table, Value};
use crate::error::PipelineError;
use crate::pipeline::normalize_json_rows;

/// A named query with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Logical name, used for logging and by file-backed executors.
    pub name: String,
    /// Query text handed to the engine.
    pub query: String,
    /// Bound parameters, sorted by name.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl QueryRequest {
    /// Request without parameters.
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            params: BTreeMap::new(),
        }
    }

    /// Bind a parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Raw result as returned by the engine: column names plus row tuples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, parallel to every row.
    pub columns: Vec<String>,
    /// Row tuples of JSON scalars.
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    /// Result built from already typed cells.
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Normalize into a [`Table`].
    pub fn into_table(self) -> Result<Table, PipelineError> {
        normalize_json_rows(&self.rows, &self.columns)
    }
}

/// Query execution error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// No result exists for this query.
    #[error("Query not found: {name}")]
    NotFound {
        /// Query name.
        name: String,
    },

    /// Reading the result failed.
    #[error("I/O error for query {name}: {message}")]
    Io {
        /// Query name.
        name: String,
        /// Error details.
        message: String,
    },

    /// The result is not a valid `{columns, rows}` document.
    #[error("Failed to decode result of query {name}: {message}")]
    Decode {
        /// Query name.
        name: String,
        /// Error details.
        message: String,
    },

    /// The engine rejected or failed the query.
    #[error("Query {name} failed: {message}")]
    Execution {
        /// Query name.
        name: String,
        /// Error details.
        message: String,
    },
}

/// Port for running analytical queries.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a query and return its raw rows.
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError>;
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for std::sync::Arc<T> {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn query_result_into_table() {
        let result: QueryResult = serde_json::from_value(json!({
            "columns": ["mt", "transactions"],
            "rows": [["2024-01-01", 12], ["2024-02-01", 3.5]]
        }))
        .unwrap();

        let table = result.into_table().unwrap();
        assert_eq!(table.columns(), ["mt", "transactions"]);
        assert_eq!(
            table.numeric_column("transactions").unwrap(),
            vec![dec!(12), dec!(3.5)]
        );
    }

    #[test]
    fn query_result_ragged_rows() {
        let result = QueryResult {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![json!(1)]],
        };
        assert!(matches!(
            result.into_table(),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn request_params_sorted() {
        let request = QueryRequest::new("tvl", "select 1")
            .param("protocol", "lofty")
            .param("chain", "algorand");
        let keys: Vec<_> = request.params.keys().cloned().collect();
        assert_eq!(keys, ["chain", "protocol"]);
    }
}
