//! Configuration for concurrent fetch dispatch.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for concurrent fetch dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum tasks in flight (0 = one worker per task).
    pub max_workers: usize,

    /// Timeout per task in seconds (0 = no timeout).
    pub task_timeout_secs: u64,

    /// Whether to log progress after every completed task.
    pub track_progress: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            task_timeout_secs: 0,
            track_progress: true,
        }
    }
}

impl DispatchConfig {
    /// Workers used for a batch of `tasks` tasks.
    #[must_use]
    pub fn effective_workers(&self, tasks: usize) -> usize {
        if self.max_workers == 0 {
            tasks.max(1)
        } else {
            self.max_workers.min(tasks.max(1))
        }
    }

    /// Per-task timeout, if any.
    #[must_use]
    pub const fn task_timeout(&self) -> Option<Duration> {
        if self.task_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.task_timeout_secs))
        }
    }
}
