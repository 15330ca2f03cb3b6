use deadpool_redis::{redis::AsyncCommands, Connection};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::{keys, queues, IngestDocumentsJob, JobResult, QueueError, RedisPool, Result};
use crate::application::IngestionService;
use crate::domain::{DomainError, IngestionSummary};
use crate::infrastructure::config::RetryPolicy;

const POLL_TIMEOUT_SECONDS: f64 = 1.0;

struct ConsumerState {
    redis_pool: RedisPool,
    ingestion: Arc<IngestionService>,
    retry: RetryPolicy,
    result_ttl: u64,
}

/// Pops ingestion jobs from Redis and runs them against the process's own
/// index, at most `concurrency` at a time.
pub struct JobConsumer {
    state: Arc<ConsumerState>,
    concurrency: usize,
}

impl JobConsumer {
    pub fn new(
        redis_pool: RedisPool,
        ingestion: Arc<IngestionService>,
        retry: RetryPolicy,
        concurrency: usize,
        result_ttl: u64,
    ) -> Self {
        Self {
            state: Arc::new(ConsumerState {
                redis_pool,
                ingestion,
                retry,
                result_ttl,
            }),
            concurrency: concurrency.max(1),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        tracing::info!(concurrency = self.concurrency, "ingestion consumer started");

        loop {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| QueueError::Pool(e.to_string()))?;
            let state = self.state.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_next_job(&state).await {
                    tracing::error!(error = %e, "job failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            });

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

async fn conn(state: &ConsumerState) -> Result<Connection> {
    state
        .redis_pool
        .get()
        .await
        .map_err(|e| QueueError::Pool(e.to_string()))
}

async fn set_status(state: &ConsumerState, conn: &mut Connection, job_id: Uuid, status: &JobResult) -> Result<()> {
    let json = serde_json::to_string(status)?;
    conn.set_ex::<_, _, ()>(keys::job_status(&job_id), &json, state.result_ttl)
        .await
        .map_err(|e| QueueError::Redis(e.to_string()))
}

async fn process_next_job(state: &ConsumerState) -> Result<()> {
    let mut c = conn(state).await?;

    let popped: Option<(String, String)> = c
        .brpop(queues::INGEST_QUEUE, POLL_TIMEOUT_SECONDS)
        .await
        .map_err(|e| QueueError::Redis(e.to_string()))?;

    if let Some((_queue, job_json)) = popped {
        process_ingest_job(state, &mut c, serde_json::from_str(&job_json)?).await?;
    }
    Ok(())
}

async fn process_ingest_job(state: &ConsumerState, c: &mut Connection, job: IngestDocumentsJob) -> Result<()> {
    tracing::info!(job_id = %job.job_id, documents = job.document_ids.len(), "processing ingest");
    set_status(state, c, job.job_id, &JobResult::processing(job.job_id)).await?;

    let status = match run_ingest_job(&state.ingestion, &job, &state.retry).await {
        Ok(summary) => JobResult::completed(job.job_id, serde_json::to_value(&summary)?),
        Err(e) => JobResult::failed(job.job_id, e.to_string()),
    };
    set_status(state, c, job.job_id, &status).await?;

    tracing::info!(job_id = %job.job_id, status = ?status.status, "ingest finished");
    Ok(())
}

/// Runs one job, re-ingesting documents whose failure was retryable until
/// they succeed or the policy's attempts are used up.
pub async fn run_ingest_job(
    ingestion: &IngestionService,
    job: &IngestDocumentsJob,
    retry: &RetryPolicy,
) -> std::result::Result<IngestionSummary, DomainError> {
    let mut summary = if job.is_folder_sync() {
        ingestion.sync_folder(job.folder.as_deref()).await?
    } else {
        ingestion.ingest(&job.document_ids).await
    };

    for attempt in 2..=retry.max_attempts {
        let ids = summary.retryable_ids();
        if ids.is_empty() {
            break;
        }

        tokio::time::sleep(retry.backoff(attempt)).await;
        tracing::info!(job_id = %job.job_id, attempt, documents = ids.len(), "retrying documents");
        let retried = ingestion.ingest(&ids).await;
        summary.merge_retry(retried);
    }

    Ok(summary)
}
