mod document;
mod embedding;
mod segment;
mod summary;

pub use document::{Document, DocumentFormat, SourceFile, GOOGLE_SLIDES_MIME, PPTX_MIME};
pub use embedding::Embedding;
pub use segment::{EmbeddingRecord, QueryResult, SearchResult, Segment, SourceRef};
pub use summary::{
    Answer, DocumentFailure, IndexReport, IngestionSummary, SegmentFailure,
};
