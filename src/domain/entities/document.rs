use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const GOOGLE_SLIDES_MIME: &str = "application/vnd.google-apps.presentation";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// A fetched source blob. Lives only until its segments are extracted.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub source_location: String,
    pub mime_type: Option<String>,
    pub content: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: Vec<u8>) -> Self {
        let id = id.into();
        Self {
            source_location: id.clone(),
            id,
            name: name.into(),
            mime_type: None,
            content,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_source_location(mut self, location: impl Into<String>) -> Self {
        self.source_location = location.into();
        self
    }

    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::detect(self.mime_type.as_deref(), &self.name, &self.content)
    }
}

/// Source formats the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pptx,
    PlainText,
}

impl DocumentFormat {
    /// Resolves the format from the MIME type, then the file extension, then
    /// the leading bytes.
    pub fn detect(mime_type: Option<&str>, name: &str, content: &[u8]) -> Option<Self> {
        if let Some(format) = mime_type.and_then(Self::from_mime_type) {
            return Some(format);
        }

        if let Some(format) = Self::from_file_name(name) {
            return Some(format);
        }

        if content.starts_with(ZIP_MAGIC) {
            return Some(Self::Pptx);
        }

        None
    }

    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            PPTX_MIME | GOOGLE_SLIDES_MIME => Some(Self::Pptx),
            other if other.starts_with("text/") => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pptx" => Some(Self::Pptx),
            "txt" | "text" | "md" | "markdown" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Listing entry returned by a document source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl SourceFile {
    pub fn format(&self) -> Option<DocumentFormat> {
        self.mime_type
            .as_deref()
            .and_then(DocumentFormat::from_mime_type)
            .or_else(|| DocumentFormat::from_file_name(&self.name))
    }
}
