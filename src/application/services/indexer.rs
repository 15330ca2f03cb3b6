use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::application::timeout::with_timeout;
use crate::domain::{
    ports::{EmbeddingService, IndexMirror, VectorStore},
    DomainError, Embedding, EmbeddingRecord, IndexReport, Segment, SegmentFailure,
};

/// Embeds a document's segments and swaps them into the index in one step.
pub struct EmbeddingIndexer {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    mirror: Option<Arc<dyn IndexMirror>>,
    timeout: Duration,
    concurrency: usize,
}

impl EmbeddingIndexer {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorStore>,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            embedding,
            store,
            mirror: None,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn IndexMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Segments that fail to embed are skipped and reported. If every
    /// segment fails the index is left untouched and the first error is
    /// returned.
    #[instrument(skip(self, segments), fields(count = segments.len()))]
    pub async fn embed_and_store(
        &self,
        document_id: &str,
        segments: &[Segment],
    ) -> Result<IndexReport, DomainError> {
        if let Some(stray) = segments.iter().find(|s| s.document_id != document_id) {
            return Err(DomainError::invalid_argument(format!(
                "segment {} belongs to {}, not {document_id}",
                stray.position, stray.document_id
            )));
        }

        let model = self.embedding.model_id().to_string();
        if let Some(indexed) = self.store.embedding_model().filter(|m| *m != model) {
            return Err(DomainError::ModelMismatch {
                expected: indexed,
                actual: model,
            });
        }

        let outcomes: Vec<(usize, Result<Embedding, DomainError>)> = stream::iter(0..segments.len())
            .map(|i| async move {
                let text = &segments[i].text;
                let vector = with_timeout(self.timeout, "embedding", self.embedding.embed(text)).await;
                (i, vector)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut dimension = self.store.dimension();
        let mut records = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        let mut first_error = None;

        for (i, outcome) in outcomes {
            let segment = &segments[i];
            match outcome.and_then(|v| check_vector(&mut dimension, v)) {
                Ok(vector) => records.push(EmbeddingRecord::from_segment(segment, vector)),
                Err(e) => {
                    tracing::warn!(document_id, position = segment.position, error = %e, "segment skipped");
                    failures.push(SegmentFailure::new(document_id, segment.position, &e));
                    first_error.get_or_insert(e);
                }
            }
        }

        if records.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let committed = self
            .store
            .replace_document(document_id, &model, records)
            .await?;

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.replace_document(document_id, &model, &committed).await {
                tracing::warn!(document_id, error = %e, "index mirror update failed");
            }
        }

        tracing::info!(
            document_id,
            inserted = committed.len(),
            skipped = failures.len(),
            "document indexed"
        );

        Ok(IndexReport {
            inserted: committed.len(),
            failures,
        })
    }

    #[instrument(skip(self))]
    pub async fn remove_document(&self, document_id: &str) -> Result<usize, DomainError> {
        let removed = self.store.remove_document(document_id).await?;

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.remove_document(document_id).await {
                tracing::warn!(document_id, error = %e, "index mirror delete failed");
            }
        }

        Ok(removed)
    }
}

/// The first vector of a batch fixes the dimension when the index has none.
fn check_vector(dimension: &mut Option<usize>, vector: Embedding) -> Result<Embedding, DomainError> {
    if !vector.is_finite() {
        return Err(DomainError::invalid_argument(
            "embedding contains NaN or infinite components",
        ));
    }
    match *dimension {
        Some(expected) if expected != vector.dimension() => Err(DomainError::DimensionMismatch {
            expected,
            actual: vector.dimension(),
        }),
        Some(_) => Ok(vector),
        None => {
            *dimension = Some(vector.dimension());
            Ok(vector)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::infrastructure::vector_store::InMemoryVectorStore;
    use crate::testing::FakeEmbedder;

    fn segments(document_id: &str, texts: &[&str]) -> Vec<Segment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Segment::new(document_id, i, *t))
            .collect()
    }

    fn indexer(embedder: Arc<FakeEmbedder>, store: Arc<InMemoryVectorStore>) -> EmbeddingIndexer {
        EmbeddingIndexer::new(embedder, store, Duration::from_secs(1), 2)
    }

    #[tokio::test]
    async fn test_embed_and_store_inserts_every_segment() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(Arc::new(FakeEmbedder::new(4)), store.clone());

        let report = indexer
            .embed_and_store("deck", &segments("deck", &["a", "bb", "ccc"]))
            .await
            .unwrap();

        assert_eq!(report.inserted, 3);
        assert!(report.failures.is_empty());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_segment_is_skipped_and_reported() {
        let embedder = Arc::new(FakeEmbedder::new(4));
        embedder.fail_on("quota");
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(embedder, store.clone());

        let report = indexer
            .embed_and_store("deck", &segments("deck", &["ok", "hits quota", "fine"]))
            .await
            .unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].position, 1);
        assert_eq!(report.failures[0].kind, ErrorKind::Transient);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_all_segments_failing_keeps_previous_records() {
        let embedder = Arc::new(FakeEmbedder::new(4));
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(embedder.clone(), store.clone());
        indexer
            .embed_and_store("deck", &segments("deck", &["v1 a", "v1 b"]))
            .await
            .unwrap();

        embedder.fail_on("v2");
        let err = indexer
            .embed_and_store("deck", &segments("deck", &["v2 a", "v2 b", "v2 c"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_wrong_dimension_segment_is_rejected() {
        let embedder = Arc::new(FakeEmbedder::new(4));
        embedder.set("odd", vec![1.0, 0.0]);
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(embedder, store.clone());

        let report = indexer
            .embed_and_store("deck", &segments("deck", &["even", "odd"]))
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.failures[0].kind, ErrorKind::DimensionMismatch);
    }

    #[tokio::test]
    async fn test_non_finite_segment_vector_is_skipped() {
        let embedder = Arc::new(FakeEmbedder::new(4));
        embedder.set("broken", vec![f32::NAN, 0.0, 0.0, 1.0]);
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(embedder, store.clone());

        let report = indexer
            .embed_and_store("deck", &segments("deck", &["good", "broken", "also good"]))
            .await
            .unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].position, 1);
        assert_eq!(report.failures[0].kind, ErrorKind::InvalidArgument);

        let query = Embedding::new(vec![1.0, 0.0, 0.0, 0.0]);
        let results = store.search(&query, 3).await.unwrap();
        assert!(results.iter().all(|r| r.score.is_finite()));
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_other_model_is_rejected_while_index_has_records() {
        let store = Arc::new(InMemoryVectorStore::new());
        indexer(Arc::new(FakeEmbedder::new(4)), store.clone())
            .embed_and_store("a", &segments("a", &["one"]))
            .await
            .unwrap();

        let drifted = indexer(
            Arc::new(FakeEmbedder::new(4).with_model("other-model")),
            store.clone(),
        );
        let err = drifted
            .embed_and_store("b", &segments("b", &["two"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ModelMismatch);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_segment_is_invalid_argument() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(Arc::new(FakeEmbedder::new(4)), store.clone());

        let err = indexer
            .embed_and_store("deck", &segments("other", &["x"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_document() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(Arc::new(FakeEmbedder::new(4)), store.clone());
        indexer
            .embed_and_store("deck", &segments("deck", &["a", "b"]))
            .await
            .unwrap();

        assert_eq!(indexer.remove_document("deck").await.unwrap(), 2);
        assert!(store.is_empty());
    }
}
