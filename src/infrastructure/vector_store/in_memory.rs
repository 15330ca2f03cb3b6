use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::{
    ports::{IndexStats, VectorStore},
    DomainError, Embedding, EmbeddingRecord, QueryResult, SearchResult,
};

#[derive(Default)]
struct IndexState {
    /// Kept in ascending `seq` order.
    records: Vec<EmbeddingRecord>,
    dimension: Option<usize>,
    model: Option<String>,
    next_seq: u64,
}

/// Brute-force cosine index held in process memory.
///
/// All state sits behind one lock: searches share the read side and a
/// document replace holds the write side for its whole delete+insert.
pub struct InMemoryVectorStore {
    state: RwLock<IndexState>,
    configured_dimension: Option<usize>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::with_dimension(None)
    }

    /// Pins the dimensionality up front instead of taking it from the first
    /// insert.
    pub fn with_dimension(dimension: Option<usize>) -> Self {
        Self {
            state: RwLock::new(IndexState {
                dimension,
                next_seq: 1,
                ..IndexState::default()
            }),
            configured_dimension: dimension,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>, DomainError> {
        self.state
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>, DomainError> {
        self.state
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))
    }

    /// An empty index forgets the previous model and learned dimension.
    fn reset_if_empty(&self, state: &mut IndexState) {
        if state.records.is_empty() {
            state.dimension = self.configured_dimension;
            state.model = None;
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads previously committed records, keeping their original insertion
    /// order. Only valid on an empty index.
    pub fn restore(&self, model: &str, mut records: Vec<EmbeddingRecord>) -> Result<usize, DomainError> {
        let mut state = self.write()?;
        if !state.records.is_empty() {
            return Err(DomainError::internal("restore requires an empty index"));
        }

        records.sort_by_key(|r| r.seq);

        let mut seen = HashSet::new();
        let mut dimension = state.dimension;
        for record in &records {
            if !record.vector.is_finite() {
                return Err(DomainError::internal(format!(
                    "mirrored record for {} at position {} has non-finite components",
                    record.document_id, record.position
                )));
            }
            let expected = *dimension.get_or_insert(record.dimension());
            if record.dimension() != expected {
                return Err(DomainError::DimensionMismatch {
                    expected,
                    actual: record.dimension(),
                });
            }
            if !seen.insert((record.document_id.as_str(), record.position)) {
                return Err(DomainError::internal(format!(
                    "duplicate record for {} at position {}",
                    record.document_id, record.position
                )));
            }
        }

        let restored = records.len();
        if let Some(last) = records.last() {
            state.next_seq = last.seq + 1;
            state.model = Some(model.to_string());
        }
        state.dimension = dimension;
        state.records = records;
        Ok(restored)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_batch(document_id: &str, records: &[EmbeddingRecord]) -> Result<(), DomainError> {
    let mut positions = HashSet::new();
    for record in records {
        if record.document_id != document_id {
            return Err(DomainError::invalid_argument(format!(
                "record for {} submitted under document {}",
                record.document_id, document_id
            )));
        }
        if !record.vector.is_finite() {
            return Err(DomainError::invalid_argument(format!(
                "record {} of document {} has non-finite components",
                record.position, document_id
            )));
        }
        if !positions.insert(record.position) {
            return Err(DomainError::invalid_argument(format!(
                "duplicate position {} for document {}",
                record.position, document_id
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn replace_document(
        &self,
        document_id: &str,
        model: &str,
        mut records: Vec<EmbeddingRecord>,
    ) -> Result<Vec<EmbeddingRecord>, DomainError> {
        validate_batch(document_id, &records)?;

        let mut store = self.write()?;

        if !records.is_empty() {
            if let Some(expected) = store.model.as_deref().filter(|m| *m != model) {
                return Err(DomainError::ModelMismatch {
                    expected: expected.to_string(),
                    actual: model.to_string(),
                });
            }

            let expected = store.dimension.unwrap_or_else(|| records[0].dimension());
            if let Some(bad) = records.iter().find(|r| r.dimension() != expected) {
                return Err(DomainError::DimensionMismatch {
                    expected,
                    actual: bad.dimension(),
                });
            }
            store.dimension = Some(expected);
            store.model = Some(model.to_string());
        }

        store.records.retain(|r| r.document_id != document_id);
        for record in &mut records {
            record.seq = store.next_seq;
            store.next_seq += 1;
        }
        store.records.extend(records.iter().cloned());
        self.reset_if_empty(&mut store);

        Ok(records)
    }

    async fn remove_document(&self, document_id: &str) -> Result<usize, DomainError> {
        let mut store = self.write()?;

        let before = store.records.len();
        store.records.retain(|r| r.document_id != document_id);
        self.reset_if_empty(&mut store);
        Ok(before - store.records.len())
    }

    async fn search(&self, query: &Embedding, top_k: usize) -> Result<QueryResult, DomainError> {
        if top_k == 0 {
            return Err(DomainError::invalid_argument("k must be a positive integer"));
        }
        if !query.is_finite() {
            return Err(DomainError::invalid_argument(
                "query vector has non-finite components",
            ));
        }

        let store = self.read()?;

        if store.records.is_empty() {
            return Err(DomainError::invalid_argument("index is empty"));
        }
        if let Some(expected) = store.dimension.filter(|d| *d != query.dimension()) {
            return Err(DomainError::DimensionMismatch {
                expected,
                actual: query.dimension(),
            });
        }

        let query_norm = query.norm();
        let mut scored: Vec<(usize, f32)> = store
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (i, query.cosine_similarity_with_norm(&record.vector, query_norm)))
            .collect();

        // Records are stored in insertion order, so the index breaks ties.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(i, score)| SearchResult {
                record: store.records[i].clone(),
                score,
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats, DomainError> {
        let store = self.read()?;

        let documents: HashSet<&str> = store
            .records
            .iter()
            .map(|r| r.document_id.as_str())
            .collect();

        Ok(IndexStats {
            documents: documents.len(),
            records: store.records.len(),
            dimension: store.dimension,
            embedding_model: store.model.clone(),
        })
    }

    fn dimension(&self) -> Option<usize> {
        self.read().ok().and_then(|s| s.dimension)
    }

    fn embedding_model(&self) -> Option<String> {
        self.read().ok().and_then(|s| s.model.clone())
    }
}
