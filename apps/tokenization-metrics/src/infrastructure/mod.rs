//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `price_feed/`: daily close prices (HTTP candle endpoint, static feed)
//! - `query/`: query results (exported files, in-memory, TTL cache)
//! - `output`: JSON files for the chart builders

pub mod output;
pub mod price_feed;
pub mod query;
