use crate::domain::{errors::DomainError, EmbeddingRecord};
use async_trait::async_trait;

/// Durable copy of the index, written after each committed replace and read
/// back once at startup.
#[async_trait]
pub trait IndexMirror: Send + Sync {
    async fn replace_document(
        &self,
        document_id: &str,
        model: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(), DomainError>;
    async fn remove_document(&self, document_id: &str) -> Result<(), DomainError>;
    /// Records stored under `model`; records of any other model are skipped.
    async fn load(&self, model: &str) -> Result<Vec<EmbeddingRecord>, DomainError>;
}
