//! Aggregation pipeline stages.
//!
//! ```text
//! query rows ─► normalize ─► fill_gaps ─► reconcile ─► enrich ─► cumulative ─► chart table
//! ```
//!
//! Every stage except enrichment is a pure function from tables to a new
//! table. Enrichment awaits the price feed but otherwise follows the same
//! contract.

pub mod change;
pub mod cumulative;
pub mod enrichment;
pub mod families;
pub mod gap_fill;
pub mod normalize;
pub mod reconcile;

pub use change::{
    ChangeIndicator, Kpi, format_large_number, latest_vs_lookback, latest_vs_previous,
    trailing_window,
};
pub use cumulative::{CumulativeSpec, add_cumulative, add_cumulative_columns};
pub use enrichment::{
    AssetColumn, AssetFailure, DEFAULT_TOTAL_COLUMN, EnrichmentReport, PriceEnricher, Sleeper,
    TokioSleeper,
};
pub use families::{MetricSeriesSpec, PERIOD_COLUMN, monthly_series};
pub use gap_fill::{SpineBounds, fill_gaps};
pub use normalize::{normalize_json_rows, normalize_rows};
pub use reconcile::{Expr, OutputColumn, ReconcileRule, col, diff, ratio, reconcile, sum};
