use crate::domain::errors::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait ResponseComposer: Send + Sync {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String, DomainError>;
    fn model_id(&self) -> &str;
}
