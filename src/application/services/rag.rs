use serde_json::{Map, Value};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::application::timeout::with_timeout;
use crate::domain::{
    ports::{EmbeddingService, ResponseComposer, VectorStore},
    Answer, DomainError, ErrorKind, QueryResult, SourceRef,
};

const NO_CONTEXT: &str = "the knowledge base has no indexed documents";

pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    composer: Arc<dyn ResponseComposer>,
    default_top_k: usize,
    embed_timeout: Duration,
    compose_timeout: Duration,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        composer: Arc<dyn ResponseComposer>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            composer,
            default_top_k,
            embed_timeout: Duration::from_secs(30),
            compose_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, embed: Duration, compose: Duration) -> Self {
        self.embed_timeout = embed;
        self.compose_timeout = compose;
        self
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn composer_model(&self) -> &str {
        self.composer.model_id()
    }

    /// Top-k records for `query`. An empty index is an invalid argument here;
    /// `answer` reports it as missing context instead.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<QueryResult, DomainError> {
        let top_k = self.validate(query, top_k)?;
        if self.vector_store.stats().await?.records == 0 {
            return Err(DomainError::invalid_argument("index is empty"));
        }
        self.search(query, top_k).await
    }

    #[instrument(skip(self, extra_context))]
    pub async fn answer(
        &self,
        prompt: &str,
        top_k: Option<usize>,
        extra_context: Option<&Map<String, Value>>,
    ) -> Result<Answer, DomainError> {
        let top_k = self.validate(prompt, top_k)?;
        if self.vector_store.stats().await?.records == 0 {
            return Err(DomainError::no_context(NO_CONTEXT));
        }

        // The last document can be removed between the check and the search.
        let results = match self.search(prompt, top_k).await {
            Err(e) if e.kind() == ErrorKind::InvalidArgument => {
                if self.vector_store.stats().await?.records == 0 {
                    return Err(DomainError::no_context(NO_CONTEXT));
                }
                return Err(e);
            }
            results => results?,
        };
        let context = build_context(prompt, &results, extra_context);

        let response = with_timeout(
            self.compose_timeout,
            "response generation",
            self.composer.generate(prompt, &context),
        )
        .await?;

        Ok(Answer {
            response,
            sources: results.iter().map(SourceRef::from).collect(),
            model: self.composer.model_id().to_string(),
        })
    }

    fn validate(&self, prompt: &str, top_k: Option<usize>) -> Result<usize, DomainError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::invalid_argument("prompt must not be empty"));
        }
        match top_k.unwrap_or(self.default_top_k) {
            0 => Err(DomainError::invalid_argument("k must be a positive integer")),
            k => Ok(k),
        }
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<QueryResult, DomainError> {
        // Query and stored vectors must share an embedding space.
        let model = self.embedding.model_id();
        if let Some(indexed) = self.vector_store.embedding_model().filter(|m| m != model) {
            return Err(DomainError::ModelMismatch {
                expected: indexed,
                actual: model.to_string(),
            });
        }

        let embedding =
            with_timeout(self.embed_timeout, "query embedding", self.embedding.embed(query)).await?;
        let results = self.vector_store.search(&embedding, top_k).await?;

        tracing::debug!(hits = results.len(), top_k, "retrieved context");
        Ok(results)
    }
}

/// Assembles the retrieved segments, optional caller context and the prompt
/// into the text handed to the response composer.
pub fn build_context(prompt: &str, results: &QueryResult, extra: Option<&Map<String, Value>>) -> String {
    let mut context = String::from("Based on the following company information:\n");

    for (i, result) in results.iter().enumerate() {
        let record = &result.record;
        let _ = write!(context, "[Document {}] {}", i + 1, record.source_name);
        if let Some(slide) = record.slide_index {
            let _ = write!(context, " (slide {slide})");
        }
        let _ = writeln!(context, "\n{}\n", record.text);
    }

    if let Some(extra) = extra.filter(|m| !m.is_empty()) {
        context.push_str("Additional context:\n");
        for (key, value) in extra {
            match value {
                Value::String(s) => {
                    let _ = writeln!(context, "{key}: {s}");
                }
                other => {
                    let _ = writeln!(context, "{key}: {other}");
                }
            }
        }
        context.push('\n');
    }

    let _ = write!(context, "User prompt:\n{prompt}");
    context
}
