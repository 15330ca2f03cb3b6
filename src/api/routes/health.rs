use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use deadpool_redis::redis::cmd;
use serde::Serialize;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::ports::IndexStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub knowledge_base: IndexStats,
    pub model: String,
    pub queue: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        message: "Presale assistant API is running".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let queue = match state.redis_pool.get().await {
        Ok(mut conn) => {
            let ping: Result<String, _> = cmd("PING").query_async(&mut *conn).await;
            if ping.is_ok() {
                "connected"
            } else {
                "disconnected"
            }
        }
        Err(_) => "disconnected",
    };

    let knowledge_base = state.index.stats().await?;

    Ok(Json(StatusResponse {
        status: if knowledge_base.records > 0 { "ready" } else { "empty" }.into(),
        last_sync: state.ingestion_service.last_sync(),
        knowledge_base,
        model: state.rag_service.composer_model().to_string(),
        queue: queue.into(),
    }))
}
