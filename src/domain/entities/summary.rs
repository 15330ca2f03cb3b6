use serde::{Deserialize, Serialize};

use super::SourceRef;
use crate::domain::errors::{DomainError, ErrorKind};

/// A segment that could not be embedded or stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub document_id: String,
    pub position: usize,
    pub kind: ErrorKind,
    pub message: String,
}

impl SegmentFailure {
    pub fn new(document_id: impl Into<String>, position: usize, error: &DomainError) -> Self {
        Self {
            document_id: document_id.into(),
            position,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of indexing one document's segments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexReport {
    pub inserted: usize,
    pub failures: Vec<SegmentFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub document_id: String,
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl DocumentFailure {
    pub fn new(document_id: impl Into<String>, error: &DomainError) -> Self {
        Self {
            document_id: document_id.into(),
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Aggregate result of an ingestion batch. Per-document and per-segment
/// errors are collected here instead of aborting the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub records_inserted: usize,
    pub errors: Vec<DocumentFailure>,
    pub segment_errors: Vec<SegmentFailure>,
}

impl IngestionSummary {
    pub fn record_success(&mut self, report: IndexReport) {
        self.succeeded += 1;
        self.records_inserted += report.inserted;
        self.segment_errors.extend(report.failures);
    }

    pub fn record_failure(&mut self, document_id: &str, error: &DomainError) {
        self.failed += 1;
        self.errors.push(DocumentFailure::new(document_id, error));
    }

    /// Folds a retry pass over `retryable_ids()` into this summary: the
    /// retryable failures are replaced by their new outcome.
    pub fn merge_retry(&mut self, retry: IngestionSummary) {
        let before = self.errors.len();
        self.errors.retain(|e| !e.retryable);
        self.failed -= before - self.errors.len();

        self.succeeded += retry.succeeded;
        self.failed += retry.failed;
        self.records_inserted += retry.records_inserted;
        self.errors.extend(retry.errors);
        self.segment_errors.extend(retry.segment_errors);
    }

    pub fn retryable_ids(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| e.retryable)
            .map(|e| e.document_id.clone())
            .collect()
    }
}

/// A grounded response from the query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_success_and_failure() {
        let mut summary = IngestionSummary::default();
        summary.record_success(IndexReport {
            inserted: 3,
            failures: vec![SegmentFailure::new(
                "a",
                2,
                &DomainError::transient("quota"),
            )],
        });
        summary.record_failure("b", &DomainError::extraction("b", "not a zip"));

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.records_inserted, 3);
        assert_eq!(summary.segment_errors.len(), 1);
        assert_eq!(summary.errors[0].kind, ErrorKind::Extraction);
        assert!(summary.retryable_ids().is_empty());
    }

    #[test]
    fn test_merge_retry_replaces_retryable_failures() {
        let mut summary = IngestionSummary::default();
        summary.record_failure("bad", &DomainError::extraction("bad", "corrupt"));
        summary.record_failure("slow", &DomainError::timeout("fetch"));
        summary.record_failure("flaky", &DomainError::transient("503"));
        assert_eq!(summary.retryable_ids(), vec!["slow", "flaky"]);

        let mut retry = IngestionSummary::default();
        retry.record_success(IndexReport {
            inserted: 2,
            failures: Vec::new(),
        });
        retry.record_failure("flaky", &DomainError::transient("503"));
        summary.merge_retry(retry);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.records_inserted, 2);
        let ids: Vec<_> = summary.errors.iter().map(|e| e.document_id.as_str()).collect();
        assert_eq!(ids, vec!["bad", "flaky"]);
    }
}
