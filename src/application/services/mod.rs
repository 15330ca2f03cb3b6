mod indexer;
mod ingestion;
mod rag;

pub use indexer::EmbeddingIndexer;
pub use ingestion::IngestionService;
pub use rag::{build_context, RagService};
