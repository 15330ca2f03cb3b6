use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod queues {
    pub const INGEST_QUEUE: &str = "jobs:ingest";
}

pub mod keys {
    use uuid::Uuid;

    pub fn job_status(job_id: &Uuid) -> String {
        format!("job:status:{}", job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobResult {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Pending,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn processing(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Processing,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn completed(job_id: Uuid, result: serde_json::Value) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Completed,
            result: Some(result),
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Failed,
            result: None,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }
}

/// Ingest the listed documents, or sync the whole folder when no ids are
/// given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestDocumentsJob {
    pub job_id: Uuid,
    #[serde(default)]
    pub document_ids: Vec<String>,
    pub folder: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl IngestDocumentsJob {
    pub fn new(document_ids: Vec<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            document_ids,
            folder: None,
            requested_at: Utc::now(),
        }
    }

    pub fn sync_folder(folder: Option<String>) -> Self {
        Self {
            folder,
            ..Self::new(Vec::new())
        }
    }

    pub fn is_folder_sync(&self) -> bool {
        self.document_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_without_ids_is_folder_sync() {
        let job: IngestDocumentsJob = serde_json::from_value(serde_json::json!({
            "job_id": Uuid::nil(),
            "folder": "abc",
            "requested_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();

        assert!(job.is_folder_sync());
        assert_eq!(job.folder.as_deref(), Some("abc"));
        assert!(!IngestDocumentsJob::new(vec!["deck".into()]).is_folder_sync());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_value(JobResult::processing(Uuid::nil())).unwrap();
        assert_eq!(json["status"], "processing");
        assert!(json["completed_at"].is_null());
    }
}
