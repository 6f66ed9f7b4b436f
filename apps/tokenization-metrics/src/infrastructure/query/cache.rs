//! Query result cache.
//!
//! Wraps any [`QueryExecutor`] and memoizes successful results for a fixed
//! time-to-live. Entries are keyed by request name, query text and bound
//! parameters. Executors may resolve a request by name alone, so two tables
//! sharing query text still get separate entries.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::application::ports::{QueryError, QueryExecutor, QueryRequest, QueryResult};

type CacheKey = (String, String, BTreeMap<String, String>);

#[derive(Debug, Clone)]
struct CacheEntry {
    result: QueryResult,
    stored_at: Instant,
}

/// Caching decorator around a query executor.
#[derive(Debug)]
pub struct CachedQueryExecutor<E> {
    inner: E,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl<E> CachedQueryExecutor<E> {
    /// Cache results of `inner` for `ttl`.
    pub fn new(inner: E, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(request: &QueryRequest) -> CacheKey {
        (
            request.name.clone(),
            request.query.clone(),
            request.params.clone(),
        )
    }

    /// Drop the cached result of `request`, if any.
    pub fn invalidate(&self, request: &QueryRequest) {
        self.entries.write().remove(&Self::key(request));
    }

    /// Drop every cached result.
    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }

    /// Number of cached entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl<E: QueryExecutor> QueryExecutor for CachedQueryExecutor<E> {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        let key = Self::key(request);

        let fresh = {
            let entries = self.entries.read();
            entries
                .get(&key)
                .filter(|entry| entry.stored_at.elapsed() < self.ttl)
                .map(|entry| entry.result.clone())
        };
        if let Some(result) = fresh {
            debug!(query = %request.name, "Query cache hit");
            return Ok(result);
        }

        // Errors are not cached so the next cycle retries.
        let result = self.inner.execute(request).await?;
        self.entries.write().insert(
            key,
            CacheEntry {
                result: result.clone(),
                stored_at: Instant::now(),
            },
        );
        debug!(query = %request.name, "Query cache miss");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::infrastructure::query::{FileQueryExecutor, InMemoryQueryExecutor};

    fn result() -> QueryResult {
        QueryResult {
            columns: vec!["date".to_string(), "tvl".to_string()],
            rows: vec![vec![json!("2024-01-01"), json!(1)]],
        }
    }

    type Shared = Arc<InMemoryQueryExecutor>;

    fn cached(ttl: Duration) -> (Shared, CachedQueryExecutor<Shared>) {
        let inner = Arc::new(InMemoryQueryExecutor::new());
        inner.insert("tvl", result());
        (Arc::clone(&inner), CachedQueryExecutor::new(inner, ttl))
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let (inner, cache) = cached(Duration::from_secs(60));
        let request = QueryRequest::new("tvl", "select date, tvl from lending");

        assert_eq!(cache.execute(&request).await.unwrap(), result());
        assert_eq!(cache.execute(&request).await.unwrap(), result());
        assert_eq!(inner.calls("tvl"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn params_are_part_of_the_key() {
        let (inner, cache) = cached(Duration::from_secs(60));
        let base = QueryRequest::new("tvl", "select date, tvl from lending");

        cache.execute(&base.clone().param("chain", "algorand")).await.unwrap();
        cache.execute(&base.param("chain", "ethereum")).await.unwrap();
        assert_eq!(inner.calls("tvl"), 2);
    }

    #[tokio::test]
    async fn same_query_text_under_two_names_is_not_shared() {
        let dir = tempfile::tempdir().unwrap();
        for (name, v) in [("deposits", 1), ("borrows", 999)] {
            let body = json!({"columns": ["date", "v"], "rows": [["2024-01-01", v]]});
            std::fs::write(dir.path().join(format!("{name}.json")), body.to_string()).unwrap();
        }
        let cache = CachedQueryExecutor::new(
            FileQueryExecutor::new(dir.path()),
            Duration::from_secs(60),
        );

        let deposits = cache
            .execute(&QueryRequest::new("deposits", "select * from lending"))
            .await
            .unwrap();
        let borrows = cache
            .execute(&QueryRequest::new("borrows", "select * from lending"))
            .await
            .unwrap();

        assert_eq!(deposits.rows, vec![vec![json!("2024-01-01"), json!(1)]]);
        assert_eq!(borrows.rows, vec![vec![json!("2024-01-01"), json!(999)]]);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let (inner, cache) = cached(Duration::ZERO);
        let request = QueryRequest::new("tvl", "select date, tvl from lending");

        cache.execute(&request).await.unwrap();
        cache.execute(&request).await.unwrap();
        assert_eq!(inner.calls("tvl"), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let (inner, cache) = cached(Duration::from_secs(60));
        let request = QueryRequest::new("missing", "select 1");

        assert!(cache.execute(&request).await.is_err());
        assert!(cache.execute(&request).await.is_err());
        assert_eq!(inner.calls("missing"), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidation() {
        let (inner, cache) = cached(Duration::from_secs(60));
        let request = QueryRequest::new("tvl", "select date, tvl from lending");

        cache.execute(&request).await.unwrap();
        cache.invalidate(&request);
        cache.execute(&request).await.unwrap();
        assert_eq!(inner.calls("tvl"), 2);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
