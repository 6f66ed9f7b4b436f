//! Fetch tasks and their outcomes.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::domain::Table;

/// A unit of work producing one table.
pub type FetchFuture = BoxFuture<'static, anyhow::Result<Table>>;

/// Named fetch tasks, keyed and iterated in name order.
#[derive(Default)]
pub struct FetchTasks {
    tasks: BTreeMap<String, FetchFuture>,
}

impl FetchTasks {
    /// Empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. A second task with the same name replaces the first.
    #[must_use]
    pub fn add<F>(mut self, name: impl Into<String>, task: F) -> Self
    where
        F: Future<Output = anyhow::Result<Table>> + Send + 'static,
    {
        self.insert(name, task);
        self
    }

    /// Add a task in place.
    pub fn insert<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = anyhow::Result<Table>> + Send + 'static,
    {
        self.tasks.insert(name.into(), task.boxed());
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub(super) fn into_inner(self) -> BTreeMap<String, FetchFuture> {
        self.tasks
    }
}

impl fmt::Debug for FetchTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTasks")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Why a task produced no table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// One-line error message.
    pub error: String,
    /// Full error chain for diagnostics.
    pub trace: String,
}

impl FetchFailure {
    /// Failure from an error chain.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            error: err.to_string(),
            trace: format!("{err:?}"),
        }
    }

    /// Failure with no underlying error value.
    pub fn message(message: impl Into<String>) -> Self {
        let error = message.into();
        Self {
            trace: error.clone(),
            error,
        }
    }
}

/// Result of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The task returned a table.
    Success {
        /// Produced table.
        table: Table,
    },
    /// The task failed, timed out or panicked.
    Failure(FetchFailure),
}

impl FetchOutcome {
    /// Whether the task succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Table of a successful task.
    #[must_use]
    pub const fn table(&self) -> Option<&Table> {
        match self {
            Self::Success { table } => Some(table),
            Self::Failure(_) => None,
        }
    }

    /// Failure record of a failed task.
    #[must_use]
    pub const fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}
