//! Query Executor Adapters

pub mod cache;
pub mod file;
pub mod memory;

pub use cache::CachedQueryExecutor;
pub use file::FileQueryExecutor;
pub use memory::InMemoryQueryExecutor;
