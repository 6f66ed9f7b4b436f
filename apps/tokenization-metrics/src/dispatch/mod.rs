//! Concurrent fetch dispatch.
//!
//! Runs a batch of independent, named fetch tasks on the tokio runtime and
//! collects a per-task outcome:
//!
//! - bounded parallelism through a semaphore (`max_workers`, 0 = one per task)
//! - optional per-task timeout, the timed-out future is dropped
//! - panics are caught and recorded like any other failure
//!
//! # Example
//!
//! ```ignore
//! use tokenization_metrics::dispatch::{DispatchConfig, FetchDispatcher, FetchTasks};
//!
//! let tasks = FetchTasks::new()
//!     .add("tvl", fetch_table(executor.clone(), tvl_request))
//!     .add("volume", fetch_table(executor.clone(), volume_request));
//!
//! let report = FetchDispatcher::new(DispatchConfig::default()).run(tasks).await;
//! for (name, failure) in report.failures() {
//!     eprintln!("{name}: {}", failure.error);
//! }
//! ```

mod config;
mod executor;
mod progress;
mod result;
mod types;

pub use config::DispatchConfig;
pub use executor::FetchDispatcher;
pub use progress::{Progress, ProgressTracker};
pub use result::DispatchReport;
pub use types::{FetchFailure, FetchFuture, FetchOutcome, FetchTasks};
