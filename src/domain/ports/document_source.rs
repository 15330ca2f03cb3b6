use crate::domain::{errors::DomainError, Document, SourceFile};
use async_trait::async_trait;

/// Remote or local store that serves document blobs by identifier.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, document_id: &str) -> Result<Document, DomainError>;
    async fn list(&self, folder: Option<&str>) -> Result<Vec<SourceFile>, DomainError>;
}
