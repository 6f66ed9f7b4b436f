//! Concurrent fetch executor on the tokio runtime.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, Level, debug, info, span, warn};

use super::config::DispatchConfig;
use super::progress::ProgressTracker;
use super::result::DispatchReport;
use super::types::{FetchFailure, FetchFuture, FetchOutcome, FetchTasks};

/// Fans a batch of fetch tasks out and collects every outcome.
///
/// Tasks share nothing and are never retried. A failing, hanging or
/// panicking task only affects its own entry in the report.
#[derive(Debug, Clone)]
pub struct FetchDispatcher {
    config: DispatchConfig,
    task_timeout: Option<Duration>,
}

impl FetchDispatcher {
    /// Create a new dispatcher.
    #[must_use]
    pub const fn new(config: DispatchConfig) -> Self {
        let task_timeout = config.task_timeout();
        Self {
            config,
            task_timeout,
        }
    }

    /// Override the per-task timeout with a finer-grained duration.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Run every task and wait for all of them.
    pub async fn run(&self, tasks: FetchTasks) -> DispatchReport {
        let start_time = Instant::now();
        let tasks = tasks.into_inner();
        let names: Vec<String> = tasks.keys().cloned().collect();
        let workers = self.config.effective_workers(tasks.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        let tracker = ProgressTracker::new(tasks.len() as u64);

        info!(tasks = tasks.len(), workers, "Starting fetch dispatch");

        let mut set = JoinSet::new();
        for (name, task) in tasks {
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.task_timeout;
            let task_span = span!(Level::DEBUG, "fetch_task", task = %name);
            set.spawn(
                async move {
                    let permit = semaphore.acquire_owned().await.ok();
                    let outcome = execute_task(task, timeout).await;
                    drop(permit);
                    (name, outcome)
                }
                .instrument(task_span),
            );
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    tracker.task_completed(outcome.is_success());
                    if self.config.track_progress {
                        let progress = tracker.progress();
                        debug!(
                            "Progress: {:.1}% ({}/{}), {} failed",
                            progress.percentage(),
                            progress.completed,
                            progress.total,
                            progress.failed
                        );
                    }
                    outcomes.insert(name, outcome);
                }
                Err(err) => {
                    warn!(error = %err, "Fetch task aborted before reporting");
                }
            }
        }

        for name in names {
            outcomes.entry(name).or_insert_with(|| {
                tracker.task_completed(false);
                FetchOutcome::Failure(FetchFailure::message("task aborted"))
            });
        }

        let report = DispatchReport::new(outcomes, start_time.elapsed().as_millis() as u64);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed_ms = report.total_time_ms,
            "Fetch dispatch complete"
        );
        report
    }
}

async fn execute_task(task: FetchFuture, timeout: Option<Duration>) -> FetchOutcome {
    let start = Instant::now();
    let guarded = AssertUnwindSafe(task).catch_unwind();

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "Fetch task timed out");
                return FetchOutcome::Failure(FetchFailure::message(format!(
                    "timed out after {}ms",
                    limit.as_millis()
                )));
            }
        },
        None => guarded.await,
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(Ok(table)) => {
            debug!(rows = table.len(), elapsed_ms, "Fetch task succeeded");
            FetchOutcome::Success { table }
        }
        Ok(Err(err)) => {
            warn!(error = %err, elapsed_ms, "Fetch task failed");
            FetchOutcome::Failure(FetchFailure::from_error(&err))
        }
        Err(panic) => {
            let message = format!("task panicked: {}", panic_message(panic.as_ref()));
            warn!(error = %message, elapsed_ms, "Fetch task panicked");
            FetchOutcome::Failure(FetchFailure::message(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::{Table, Value};

    fn one_row(name: &str) -> anyhow::Result<Table> {
        Ok(Table::new(
            vec!["name".to_string()],
            vec![vec![Value::from(name)]],
        )?)
    }

    #[tokio::test]
    async fn one_failing_task_among_many() {
        let mut tasks = FetchTasks::new();
        for k in 0..8 {
            let name = format!("task_{k}");
            let label = name.clone();
            tasks.insert(name, async move {
                if k == 5 {
                    anyhow::bail!("query {label} failed");
                }
                one_row(&label)
            });
        }

        let report = FetchDispatcher::new(DispatchConfig::default()).run(tasks).await;

        assert_eq!(report.len(), 8);
        assert_eq!(report.succeeded, 7);
        assert_eq!(report.failed, 1);
        let failure = report.get("task_5").and_then(FetchOutcome::failure).unwrap();
        assert_eq!(failure.error, "query task_5 failed");
        assert!(report.table("task_0").is_some());
    }

    #[tokio::test]
    async fn panic_and_timeout_are_failures() {
        let tasks = FetchTasks::new()
            .add("ok", async { one_row("ok") })
            .add("panics", async {
                if true {
                    panic!("bad row");
                }
                one_row("unreachable")
            })
            .add("hangs", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                one_row("late")
            });

        let report = FetchDispatcher::new(DispatchConfig::default())
            .with_task_timeout(Duration::from_millis(50))
            .run(tasks)
            .await;

        assert_eq!(report.len(), 3);
        assert!(report.get("ok").unwrap().is_success());
        let panicked = report.get("panics").and_then(FetchOutcome::failure).unwrap();
        assert!(panicked.error.contains("bad row"));
        let hung = report.get("hangs").and_then(FetchOutcome::failure).unwrap();
        assert!(hung.error.contains("timed out"));
    }

    #[tokio::test]
    async fn max_workers_bounds_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = FetchTasks::new();
        for k in 0..6 {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            tasks.insert(format!("t{k}"), async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                one_row("t")
            });
        }

        let config = DispatchConfig {
            max_workers: 2,
            ..DispatchConfig::default()
        };
        let report = FetchDispatcher::new(config).run(tasks).await;

        assert_eq!(report.succeeded, 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_batch() {
        let report = FetchDispatcher::new(DispatchConfig::default())
            .run(FetchTasks::new())
            .await;
        assert!(report.is_empty());
        assert_eq!(report.failed, 0);
    }
}
