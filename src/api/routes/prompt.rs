use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{SearchResult, SourceRef};

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    pub context: Option<Map<String, Value>>,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PromptMetadata {
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub metadata: PromptMetadata,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub document_id: String,
    pub source_name: String,
    pub position: usize,
    pub slide_index: Option<usize>,
    pub title: Option<String>,
    pub content: String,
    pub score: f32,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        let record = result.record;
        Self {
            document_id: record.document_id,
            source_name: record.source_name,
            position: record.position,
            slide_index: record.slide_index,
            title: record.title,
            content: record.text,
            score: result.score,
        }
    }
}

pub async fn prompt_handler(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let answer = state
        .rag_service
        .answer(&request.prompt, request.k, request.context.as_ref())
        .await?;

    Ok(Json(PromptResponse {
        response: answer.response,
        sources: answer.sources,
        metadata: PromptMetadata {
            model: answer.model,
            timestamp: Utc::now(),
        },
    }))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let results = state.rag_service.retrieve(&request.query, request.k).await?;

    Ok(Json(results.into_iter().map(SearchHit::from).collect()))
}
