// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::cast_possible_wrap
    )
)]

//! Tokenization Metrics - aggregation pipeline
//!
//! Turns analytical query results and external daily price feeds into the
//! gap-free, reconciled, cumulative series behind the asset-tokenization
//! dashboard charts.
//!
//! # Architecture (Hexagonal)
//!
//! - **Domain**: `Table`, `Value`, `PriceSeries` and the period calendar
//! - **Pipeline**: pure stages over tables
//!   - `normalize`: query rows into a table
//!   - `gap_fill`: dense period spine, duplicates summed, gaps zeroed
//!   - `reconcile`: full outer join plus derived columns
//!   - `cumulative`: running totals
//!   - `enrichment`: quantities priced in USD with forward-filled closes
//!   - `families`, `change`: chart-ready series and headline KPIs
//! - **Dispatch**: bounded concurrent fetch fan-out on tokio
//! - **Application**: ports (`QueryExecutor`, `PriceFeedPort`) and the
//!   render use case
//! - **Infrastructure**: HTTP candle feed, file and cached query executors
//!
//! # Data flow
//!
//! ```text
//! query executor → normalize → gap fill → reconcile → enrich → cumulative → JSON tables
//! ```

pub mod application;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod observability;
pub mod pipeline;

pub use error::{ErrorCode, PipelineError};
