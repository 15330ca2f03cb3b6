use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::instrument;

use crate::application::locks::KeyedLocks;
use crate::application::timeout::with_timeout;
use crate::domain::{
    ports::DocumentSource, ContentExtractor, DomainError, IndexReport, IngestionSummary,
};

use super::EmbeddingIndexer;

/// Fetch, extract and index documents by id. Failures are collected per
/// document; a batch never aborts because of one document.
pub struct IngestionService {
    source: Arc<dyn DocumentSource>,
    extractor: ContentExtractor,
    indexer: Arc<EmbeddingIndexer>,
    locks: KeyedLocks,
    fetch_timeout: Duration,
    concurrency: usize,
    last_sync: Mutex<Option<DateTime<Utc>>>,
}

impl IngestionService {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: ContentExtractor,
        indexer: Arc<EmbeddingIndexer>,
        fetch_timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            extractor,
            indexer,
            locks: KeyedLocks::new(),
            fetch_timeout,
            concurrency: concurrency.max(1),
            last_sync: Mutex::new(None),
        }
    }

    #[instrument(skip(self, document_ids), fields(count = document_ids.len()))]
    pub async fn ingest(&self, document_ids: &[String]) -> IngestionSummary {
        let outcomes: Vec<(String, Result<IndexReport, DomainError>)> =
            stream::iter(document_ids.iter().cloned())
                .map(|id| async move {
                    let outcome = self.ingest_document(&id).await;
                    (id, outcome)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut summary = IngestionSummary::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(report) => summary.record_success(report),
                Err(e) => {
                    tracing::warn!(document_id = %id, error = %e, "document ingestion failed");
                    summary.record_failure(&id, &e);
                }
            }
        }

        if let Ok(mut last_sync) = self.last_sync.lock() {
            *last_sync = Some(Utc::now());
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            records = summary.records_inserted,
            "ingestion batch finished"
        );
        summary
    }

    /// Runs the whole pipeline for one id while holding that id's lock, so
    /// concurrent ingestions of the same document are serialized.
    #[instrument(skip(self))]
    pub async fn ingest_document(&self, document_id: &str) -> Result<IndexReport, DomainError> {
        let _guard = self.locks.lock(document_id).await;

        let mut document = with_timeout(
            self.fetch_timeout,
            "document fetch",
            self.source.fetch(document_id),
        )
        .await?;
        document.id = document_id.to_string();

        let extractor = self.extractor.clone();
        let segments = tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|e| DomainError::internal(e.to_string()))??;

        tracing::debug!(document_id, segments = segments.len(), "document extracted");

        self.indexer.embed_and_store(document_id, &segments).await
    }

    /// Ingests every supported file the source lists for `folder`.
    #[instrument(skip(self))]
    pub async fn sync_folder(&self, folder: Option<&str>) -> Result<IngestionSummary, DomainError> {
        let files = with_timeout(self.fetch_timeout, "folder listing", self.source.list(folder)).await?;

        let (supported, skipped): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|f| f.format().is_some());
        for file in &skipped {
            tracing::debug!(document_id = %file.id, name = %file.name, "unsupported format, skipped");
        }

        let ids: Vec<String> = supported.into_iter().map(|f| f.id).collect();
        Ok(self.ingest(&ids).await)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, document_id: &str) -> Result<usize, DomainError> {
        let _guard = self.locks.lock(document_id).await;

        let removed = self.indexer.remove_document(document_id).await?;
        if removed == 0 {
            return Err(DomainError::not_found(format!("document {document_id} is not indexed")));
        }
        Ok(removed)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync.lock().ok().and_then(|t| *t)
    }
}
