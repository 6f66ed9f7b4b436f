//! Application Layer
//!
//! - **Ports**: interfaces to the query engine and the price feed
//! - **Use Cases**: the dashboard render cycle

pub mod ports;
pub mod use_cases;

pub use ports::*;
pub use use_cases::*;
