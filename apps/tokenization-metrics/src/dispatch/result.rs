//! Dispatch report.

use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{FetchFailure, FetchOutcome};
use crate::domain::Table;

/// Outcome of every task in a batch, keyed by task name.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// One entry per submitted task.
    pub outcomes: BTreeMap<String, FetchOutcome>,

    /// Wall time for the whole batch in milliseconds.
    pub total_time_ms: u64,

    /// Number of successful tasks.
    pub succeeded: usize,

    /// Number of failed tasks.
    pub failed: usize,
}

impl DispatchReport {
    pub(super) fn new(outcomes: BTreeMap<String, FetchOutcome>, total_time_ms: u64) -> Self {
        let succeeded = outcomes.values().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;
        Self {
            outcomes,
            total_time_ms,
            succeeded,
            failed,
        }
    }

    /// Outcome of a task.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FetchOutcome> {
        self.outcomes.get(name)
    }

    /// Table of a successful task.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.get(name).and_then(FetchOutcome::table)
    }

    /// Failed tasks with their failure records.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FetchFailure)> {
        self.outcomes
            .iter()
            .filter_map(|(name, o)| o.failure().map(|f| (name.as_str(), f)))
    }

    /// Successful tasks with their tables.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.outcomes
            .iter()
            .filter_map(|(name, o)| o.table().map(|t| (name.as_str(), t)))
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no task was submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Get the success rate.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.succeeded as f64 / self.outcomes.len() as f64
        }
    }
}
