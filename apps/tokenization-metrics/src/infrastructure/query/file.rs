//! File-backed query executor.
//!
//! Reads pre-exported query results from `<data_dir>/<name>.json`. Each file
//! holds one `{"columns": [...], "rows": [[...], ...]}` document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::{QueryError, QueryExecutor, QueryRequest, QueryResult};

/// Executor that serves results exported to disk.
#[derive(Debug, Clone)]
pub struct FileQueryExecutor {
    data_dir: PathBuf,
}

impl FileQueryExecutor {
    /// Serve results from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Result file for a query name.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }

    /// Directory results are read from.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[async_trait]
impl QueryExecutor for FileQueryExecutor {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        let path = self.path_for(&request.name);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => QueryError::NotFound {
                    name: request.name.clone(),
                },
                _ => QueryError::Io {
                    name: request.name.clone(),
                    message: e.to_string(),
                },
            })?;

        let result: QueryResult =
            serde_json::from_str(&contents).map_err(|e| QueryError::Decode {
                name: request.name.clone(),
                message: e.to_string(),
            })?;

        debug!(
            query = %request.name,
            path = %path.display(),
            rows = result.rows.len(),
            "Loaded query result"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn reads_result_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tvl.json"),
            json!({"columns": ["date", "tvl"], "rows": [["2024-01-01", 10]]}).to_string(),
        )
        .unwrap();

        let executor = FileQueryExecutor::new(dir.path());
        let result = executor
            .execute(&QueryRequest::new("tvl", "select date, tvl from lending"))
            .await
            .unwrap();

        assert_eq!(result.columns, ["date", "tvl"]);
        assert_eq!(result.rows, vec![vec![json!("2024-01-01"), json!(10)]]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let executor = FileQueryExecutor::new(dir.path());

        let err = executor
            .execute(&QueryRequest::new("nothing", "select 1"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::NotFound {
                name: "nothing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn malformed_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "[1, 2").unwrap();

        let err = FileQueryExecutor::new(dir.path())
            .execute(&QueryRequest::new("broken", "select 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Decode { .. }));
    }
}
