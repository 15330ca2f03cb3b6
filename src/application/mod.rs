//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! implementations, and own the pipeline's timeouts and per-document locking.

mod locks;
pub mod services;
mod timeout;

pub use locks::{KeyedGuard, KeyedLocks};
pub use services::{EmbeddingIndexer, IngestionService, RagService};
pub use timeout::with_timeout;
