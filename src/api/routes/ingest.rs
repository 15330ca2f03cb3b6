use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::DomainError;
use crate::infrastructure::{IngestDocumentsJob, QueueJobStatus};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IngestRequest {
    pub document_ids: Vec<String>,
    pub folder: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub job_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    if request.document_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(DomainError::invalid_argument("document ids must not be blank").into());
    }

    let job = if request.document_ids.is_empty() {
        IngestDocumentsJob::sync_folder(request.folder)
    } else {
        IngestDocumentsJob::new(request.document_ids)
    };

    let job_id = state.job_producer.push_ingest_job(&job).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            job_id,
            status: "queued".to_string(),
        }),
    ))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_result = state
        .job_producer
        .get_job_status(&job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))?;

    Ok(Json(JobStatusResponse {
        job_id: job_result.job_id,
        status: job_result.status,
        result: job_result.result,
        error: job_result.error,
    }))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state.ingestion_service.remove(&document_id).await?;
    tracing::info!(document_id, removed, "document removed from index");
    Ok(StatusCode::NO_CONTENT)
}
