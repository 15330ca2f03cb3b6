use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    fn dimension(&self) -> usize;
    /// Identifies the model and version; vectors from different ids are not
    /// comparable.
    fn model_id(&self) -> &str;
}
