use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors_output::VectorsOptions, Condition, CreateCollectionBuilder,
    DeletePointsBuilder, Distance, Filter, PointId, PointStruct, RetrievedPoint,
    ScrollPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{ports::IndexMirror, DomainError, Embedding, EmbeddingRecord};

const SCROLL_PAGE_SIZE: u32 = 256;

/// Persists committed index records to a Qdrant collection so the in-memory
/// index can be rebuilt after a restart.
pub struct QdrantMirror {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantMirror {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::transient(e.to_string()))?;

        let mirror = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        mirror.ensure_collection().await?;

        Ok(mirror)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::transient(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| DomainError::transient(e.to_string()))?;
            tracing::info!(collection = %self.collection, dimension = self.dimension, "created mirror collection");
        }

        Ok(())
    }

    fn document_filter(document_id: &str) -> Filter {
        Filter::must([Condition::matches("document_id", document_id.to_string())])
    }

    fn to_point(model: &str, record: &EmbeddingRecord) -> Result<PointStruct, DomainError> {
        let payload: Payload = serde_json::json!({
            "document_id": record.document_id,
            "position": record.position,
            "slide_index": record.slide_index,
            "title": record.title,
            "source_name": record.source_name,
            "text": record.text,
            "seq": record.seq,
            "model": model,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            record.id.to_string(),
            record.vector.as_slice().to_vec(),
            payload,
        ))
    }

    #[allow(deprecated)]
    fn from_point(point: RetrievedPoint) -> Option<EmbeddingRecord> {
        let id = match point.id?.point_id_options? {
            PointIdOptions::Uuid(s) => s.parse::<Uuid>().ok()?,
            PointIdOptions::Num(_) => return None,
        };
        let vector = match point.vectors?.vectors_options? {
            VectorsOptions::Vector(v) => v.data,
            _ => return None,
        };

        let payload = point.payload;
        let text_field = |key: &str| payload.get(key).and_then(|v| v.as_str()).cloned();
        let int_field = |key: &str| payload.get(key).and_then(|v| v.as_integer());

        Some(EmbeddingRecord {
            id,
            document_id: text_field("document_id")?,
            position: int_field("position")? as usize,
            slide_index: int_field("slide_index").map(|i| i as usize),
            title: text_field("title"),
            source_name: text_field("source_name").unwrap_or_default(),
            text: text_field("text")?,
            vector: Embedding::new(vector),
            seq: int_field("seq")? as u64,
        })
    }

    fn point_model(point: &RetrievedPoint) -> Option<&str> {
        point
            .payload
            .get("model")
            .and_then(|v| v.as_str())
            .map(String::as_str)
    }
}

#[async_trait]
impl IndexMirror for QdrantMirror {
    async fn replace_document(
        &self,
        document_id: &str,
        model: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(), DomainError> {
        self.remove_document(document_id).await?;

        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|r| Self::to_point(model, r))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::transient(e.to_string()))?;

        Ok(())
    }

    async fn remove_document(&self, document_id: &str) -> Result<(), DomainError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Self::document_filter(document_id))
                    .wait(true),
            )
            .await
            .map_err(|e| DomainError::transient(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, model: &str) -> Result<Vec<EmbeddingRecord>, DomainError> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(true)
                .with_vectors(true);
            if let Some(next) = offset.take() {
                request = request.offset(next);
            }

            let page = self
                .client
                .scroll(request)
                .await
                .map_err(|e| DomainError::transient(e.to_string()))?;

            for point in page.result {
                if Self::point_model(&point) != Some(model) {
                    skipped += 1;
                    continue;
                }
                match Self::from_point(point) {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, model, "ignored mirrored points from another model or with incomplete payload");
        }

        Ok(records)
    }
}
