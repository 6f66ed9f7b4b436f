//! Domain types: cell values, tables, price series and the period calendar.
//!
//! Nothing in here performs I/O. The pipeline stages in [`crate::pipeline`]
//! are written purely against these types.

mod period;
mod price_series;
mod table;
mod value;

pub use period::{ParsePeriodUnitError, PeriodUnit};
pub use price_series::PriceSeries;
pub use table::Table;
pub use value::Value;
