use crate::domain::{errors::DomainError, EmbeddingRecord, Embedding, QueryResult};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub records: usize,
    pub dimension: Option<usize>,
    pub embedding_model: Option<String>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Atomically swaps every record of `document_id` for `records`. Readers
    /// see either the complete old set or the complete new set.
    async fn replace_document(
        &self,
        document_id: &str,
        model: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<Vec<EmbeddingRecord>, DomainError>;
    async fn remove_document(&self, document_id: &str) -> Result<usize, DomainError>;
    async fn search(&self, query: &Embedding, top_k: usize) -> Result<QueryResult, DomainError>;
    async fn stats(&self) -> Result<IndexStats, DomainError>;
    fn dimension(&self) -> Option<usize>;
    fn embedding_model(&self) -> Option<String>;
}
