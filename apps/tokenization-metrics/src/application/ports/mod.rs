//! Application Ports (Driven)
//!
//! Interfaces to the systems the pipeline reads from: the analytical query
//! engine and the historical price provider.

mod price_feed_port;
mod query_port;

pub use price_feed_port::{PriceFeedError, PriceFeedPort};
pub use query_port::{QueryError, QueryExecutor, QueryRequest, QueryResult};
