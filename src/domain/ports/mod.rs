mod document_source;
mod embedding;
mod index_mirror;
mod response_composer;
mod vector_store;

pub use document_source::DocumentSource;
pub use embedding::EmbeddingService;
pub use index_mirror::IndexMirror;
pub use response_composer::ResponseComposer;
pub use vector_store::{IndexStats, VectorStore};
