//! Progress tracking for dispatched fetch tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Progress tracker shared by in-flight tasks.
#[derive(Debug)]
pub struct ProgressTracker {
    total_tasks: u64,
    completed_tasks: AtomicU64,
    failed_tasks: AtomicU64,
    start_time: Instant,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    #[must_use]
    pub fn new(total_tasks: u64) -> Self {
        Self {
            total_tasks,
            completed_tasks: AtomicU64::new(0),
            failed_tasks: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Mark a task as finished.
    pub fn task_completed(&self, success: bool) {
        self.completed_tasks.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_tasks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current progress.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            total: self.total_tasks,
            completed: self.completed_tasks.load(Ordering::Relaxed),
            failed: self.failed_tasks.load(Ordering::Relaxed),
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }
}

/// Progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Total number of tasks.
    pub total: u64,
    /// Finished tasks, failed ones included.
    pub completed: u64,
    /// Failed tasks.
    pub failed: u64,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

impl Progress {
    /// Get completion percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}
