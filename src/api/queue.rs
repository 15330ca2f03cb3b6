use deadpool_redis::redis::AsyncCommands;
use uuid::Uuid;

use crate::infrastructure::queue::Result;
use crate::infrastructure::{keys, queues, IngestDocumentsJob, JobResult, QueueError, RedisPool};

#[derive(Clone)]
pub struct JobProducer {
    pool: RedisPool,
    result_ttl: u64,
}

impl JobProducer {
    pub fn new(pool: RedisPool, result_ttl: u64) -> Self {
        Self { pool, result_ttl }
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Pool(e.to_string()))
    }

    async fn push_job(&self, queue: &str, job_id: Uuid, payload: &str) -> Result<Uuid> {
        let mut conn = self.conn().await?;

        // Status first, so a fast consumer never overwrites a later state.
        let status = serde_json::to_string(&JobResult::pending(job_id))?;
        conn.set_ex::<_, _, ()>(keys::job_status(&job_id), &status, self.result_ttl)
            .await
            .map_err(|e| QueueError::Redis(e.to_string()))?;

        conn.lpush::<_, _, ()>(queue, payload)
            .await
            .map_err(|e| QueueError::Redis(e.to_string()))?;

        tracing::info!(job_id = %job_id, queue, "job queued");
        Ok(job_id)
    }

    pub async fn push_ingest_job(&self, job: &IngestDocumentsJob) -> Result<Uuid> {
        self.push_job(queues::INGEST_QUEUE, job.job_id, &serde_json::to_string(job)?)
            .await
    }

    pub async fn get_job_status(&self, job_id: &Uuid) -> Result<Option<JobResult>> {
        let mut conn = self.conn().await?;
        let result: Option<String> = conn
            .get(keys::job_status(job_id))
            .await
            .map_err(|e| QueueError::Redis(e.to_string()))?;

        result
            .map(|json| serde_json::from_str(&json).map_err(Into::into))
            .transpose()
    }
}
