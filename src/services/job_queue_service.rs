use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::db::job_queries;
use crate::errors::AppError;
use crate::models::{Enqueued, Job, JobStatus};

/// Handle to the persisted job queue. Cheap to clone; clones share the
/// wake-up signal, so an enqueue through any clone wakes an idle worker.
#[derive(Clone)]
pub struct JobQueue {
    pool: SqlitePool,
    wakeup: Arc<Notify>,
}

impl JobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            wakeup: Arc::new(Notify::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a pending job. If the tenant already has a pending or processing
    /// job of this type, the unique index refuses the insert and the existing
    /// job is returned instead.
    pub async fn enqueue(&self, tenant_id: i64, job_type: &str) -> Result<Enqueued, AppError> {
        // Two attempts: the active job we collided with may finish between the
        // failed insert and the lookup.
        for _ in 0..2 {
            match job_queries::insert(&self.pool, tenant_id, job_type, Utc::now()).await {
                Ok(id) => {
                    info!("📥 Queued job {} ({}) for tenant {}", id, job_type, tenant_id);
                    self.wakeup.notify_one();
                    return Ok(Enqueued::Created(id));
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    if let Some(active) =
                        job_queries::fetch_active(&self.pool, tenant_id, job_type).await?
                    {
                        debug!(
                            "Job {} ({}) already active for tenant {}",
                            active.id, job_type, tenant_id
                        );
                        return Ok(Enqueued::AlreadyActive(active.id));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Validation(format!(
            "could not enqueue {} for tenant {}",
            job_type, tenant_id
        )))
    }

    pub async fn active_job(&self, tenant_id: i64, job_type: &str) -> Result<Option<Job>, AppError> {
        Ok(job_queries::fetch_active(&self.pool, tenant_id, job_type).await?)
    }

    pub async fn has_active(&self, tenant_id: i64, job_type: &str) -> Result<bool, AppError> {
        Ok(self.active_job(tenant_id, job_type).await?.is_some())
    }

    /// Atomically take the oldest pending job and mark it `processing`.
    pub async fn claim_next(&self) -> Result<Option<Job>, AppError> {
        Ok(job_queries::claim_next(&self.pool, Utc::now()).await?)
    }

    pub async fn complete(&self, job_id: i64) -> Result<(), AppError> {
        self.finish(job_id, JobStatus::Completed, None).await?;
        info!("Job {} updated to status: completed", job_id);
        Ok(())
    }

    pub async fn fail(&self, job_id: i64, error_message: &str) -> Result<(), AppError> {
        self.finish(job_id, JobStatus::Error, Some(error_message)).await?;
        info!("Job {} updated to status: error", job_id);
        Ok(())
    }

    pub async fn status(&self, job_id: i64) -> Result<Option<Job>, AppError> {
        Ok(job_queries::fetch_one(&self.pool, job_id).await?)
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<Job>, AppError> {
        Ok(job_queries::fetch_recent(&self.pool, limit).await?)
    }

    /// Delete completed/errored jobs created more than `older_than_days` ago.
    pub async fn purge_finished(&self, older_than_days: i64) -> Result<u64, AppError> {
        let cutoff = Utc::now() - chrono::Duration::days(older_than_days);
        let deleted = job_queries::delete_finished_before(&self.pool, cutoff).await?;
        info!("Cleared {} old jobs from the queue", deleted);
        Ok(deleted)
    }

    /// Block until something is enqueued or `idle` elapses, whichever comes first.
    pub async fn wait_for_work(&self, idle: Duration) {
        let _ = tokio::time::timeout(idle, self.wakeup.notified()).await;
    }

    async fn finish(
        &self,
        job_id: i64,
        to: JobStatus,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let changed = job_queries::finish(&self.pool, job_id, to, error, Utc::now()).await?;
        if changed == 1 {
            return Ok(());
        }

        match job_queries::fetch_one(&self.pool, job_id).await? {
            None => Err(AppError::NotFound),
            Some(job) => {
                warn!("Refusing to move job {} from {} to {}", job_id, job.status, to);
                Err(AppError::InvalidTransition {
                    job_id,
                    from: job.status,
                    to,
                })
            }
        }
    }
}
