use std::sync::Arc;

use crate::api::middleware::TokenValidator;
use crate::api::queue::JobProducer;
use crate::application::{IngestionService, RagService};
use crate::domain::ports::VectorStore;
use crate::infrastructure::{AppConfig, RedisPool};

#[derive(Clone)]
pub struct AppState {
    pub redis_pool: RedisPool,
    pub job_producer: JobProducer,
    pub rag_service: Arc<RagService>,
    pub ingestion_service: Arc<IngestionService>,
    pub index: Arc<dyn VectorStore>,
    pub token_validator: Arc<dyn TokenValidator>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        redis_pool: RedisPool,
        config: Arc<AppConfig>,
        rag_service: Arc<RagService>,
        ingestion_service: Arc<IngestionService>,
        index: Arc<dyn VectorStore>,
        token_validator: Arc<dyn TokenValidator>,
    ) -> Self {
        let job_producer =
            JobProducer::new(redis_pool.clone(), config.config.worker.result_ttl_seconds);
        Self {
            redis_pool,
            job_producer,
            rag_service,
            ingestion_service,
            index,
            token_validator,
            config,
        }
    }
}
