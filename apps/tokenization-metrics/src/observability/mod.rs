//! Observability: structured logging through `tracing`.

mod tracing;

pub use self::tracing::{TracingError, env_filter, init_tracing};
