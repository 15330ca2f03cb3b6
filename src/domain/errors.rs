use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Extraction failed for document {document_id}: {reason}")]
    Extraction { document_id: String, reason: String },

    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: index built with {expected}, got {actual}")]
    ModelMismatch { expected: String, actual: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No context available: {0}")]
    NoContext(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error category reported in ingestion summaries and job results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Extraction,
    DimensionMismatch,
    ModelMismatch,
    InvalidArgument,
    NotFound,
    NoContext,
    Transient,
    Timeout,
    Internal,
}

impl DomainError {
    pub fn extraction(document_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            document_id: document_id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn no_context(msg: impl Into<String>) -> Self {
        Self::NoContext(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::ModelMismatch { .. } => ErrorKind::ModelMismatch,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NoContext(_) => ErrorKind::NoContext,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller may retry the failed operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
