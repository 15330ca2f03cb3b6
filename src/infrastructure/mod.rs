pub mod config;
pub mod embedding;
pub mod llm;
pub mod queue;
pub mod sources;
pub mod vector_store;

pub use config::{AppConfig, Config, PromptsConfig, RetryPolicy};
pub use embedding::GeminiEmbedding;
pub use llm::GeminiComposer;
pub use queue::{
    create_pool, keys, queues, run_ingest_job, IngestDocumentsJob, JobConsumer, JobResult,
    QueueError, QueueJobStatus, RedisPool,
};
pub use sources::{GoogleDriveSource, LocalFileSource};
pub use vector_store::{InMemoryVectorStore, QdrantMirror};
