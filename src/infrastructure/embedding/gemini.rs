use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::gemini;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// Gemini text embeddings. The API key is read from `GEMINI_API_KEY`.
pub struct GeminiEmbedding {
    model: String,
    dimension: usize,
}

impl GeminiEmbedding {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.model.clone(), config.dimension)
    }
}

#[async_trait]
impl EmbeddingService for GeminiEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let client = gemini::Client::from_env();
        let model = client.embedding_model(&self.model);

        let embeddings = EmbeddingsBuilder::new(model)
            .document(text)
            .map_err(|e| DomainError::invalid_argument(e.to_string()))?
            .build()
            .await
            .map_err(|e| DomainError::transient(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .map(|(_doc, emb)| {
                let vec_f32: Vec<f32> = emb.first().vec.into_iter().map(|x| x as f32).collect();
                Embedding::new(vec_f32)
            })
            .ok_or_else(|| DomainError::transient("embedding response was empty"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
