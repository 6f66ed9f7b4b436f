//! In-memory query executor for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{QueryError, QueryExecutor, QueryRequest, QueryResult};

/// Executor answering from preloaded results, keyed by query name.
///
/// Suitable for testing and offline demos.
#[derive(Debug, Default)]
pub struct InMemoryQueryExecutor {
    results: RwLock<HashMap<String, Result<QueryResult, QueryError>>>,
    calls: RwLock<HashMap<String, usize>>,
}

impl InMemoryQueryExecutor {
    /// Create an empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `name` with `result`.
    pub fn insert(&self, name: &str, result: QueryResult) {
        self.results.write().insert(name.to_string(), Ok(result));
    }

    /// Answer `name` with `error`.
    pub fn fail_with(&self, name: &str, error: QueryError) {
        self.results.write().insert(name.to_string(), Err(error));
    }

    /// Executions seen for `name`.
    #[must_use]
    pub fn calls(&self, name: &str) -> usize {
        self.calls.read().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl QueryExecutor for InMemoryQueryExecutor {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        *self.calls.write().entry(request.name.clone()).or_insert(0) += 1;

        self.results
            .read()
            .get(&request.name)
            .cloned()
            .unwrap_or_else(|| {
                Err(QueryError::NotFound {
                    name: request.name.clone(),
                })
            })
    }
}
