mod consumer;
mod jobs;

pub use consumer::{run_ingest_job, JobConsumer};
pub use jobs::{keys, queues, IngestDocumentsJob, JobResult, QueueJobStatus};

use deadpool_redis::{Config, Pool, Runtime};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;

pub fn create_pool(redis_url: &str) -> Result<RedisPool> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| QueueError::Pool(e.to_string()))
}
