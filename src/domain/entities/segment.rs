use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Embedding;

/// Text extracted from one slide (or one paragraph chunk of a text file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub document_id: String,
    pub position: usize,
    pub text: String,
    pub slide_index: Option<usize>,
    pub title: Option<String>,
    pub source_name: String,
}

impl Segment {
    pub fn new(document_id: impl Into<String>, position: usize, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            position,
            text: text.into(),
            slide_index: None,
            title: None,
            source_name: String::new(),
        }
    }

    pub fn with_slide(mut self, slide_index: usize) -> Self {
        self.slide_index = Some(slide_index);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }
}

/// A segment's vector plus what is needed to display it in results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: Uuid,
    pub document_id: String,
    pub position: usize,
    pub slide_index: Option<usize>,
    pub title: Option<String>,
    pub source_name: String,
    pub text: String,
    pub vector: Embedding,
    /// Insertion sequence assigned by the index; 0 until committed.
    pub seq: u64,
}

impl EmbeddingRecord {
    pub fn from_segment(segment: &Segment, vector: Embedding) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: segment.document_id.clone(),
            position: segment.position,
            slide_index: segment.slide_index,
            title: segment.title.clone(),
            source_name: segment.source_name.clone(),
            text: segment.text.clone(),
            vector,
            seq: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.dimension()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub record: EmbeddingRecord,
    pub score: f32,
}

/// Search hits ordered by descending score.
pub type QueryResult = Vec<SearchResult>;

/// Reference to a retrieved segment, returned alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_id: String,
    pub source_name: String,
    pub position: usize,
    pub slide_index: Option<usize>,
    pub title: Option<String>,
    pub score: f32,
}

impl From<&SearchResult> for SourceRef {
    fn from(result: &SearchResult) -> Self {
        Self {
            document_id: result.record.document_id.clone(),
            source_name: result.record.source_name.clone(),
            position: result.record.position,
            slide_index: result.record.slide_index,
            title: result.record.title.clone(),
            score: result.score,
        }
    }
}
