use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::cost_provider::CostReportSource;
use crate::jobs::{dispatch, Clock, JobContext, JobKind};
use crate::models::Job;
use crate::services::job_queue_service::JobQueue;

/// Long-lived collaborators every job context is built from.
#[derive(Clone)]
pub struct JobDependencies {
    pub pool: SqlitePool,
    pub cost_source: Arc<dyn CostReportSource>,
    pub output_dir: Option<PathBuf>,
    pub clock: Clock,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep when the queue is empty, unless woken by an enqueue.
    pub idle_interval: Duration,
    pub job_timeout: Option<Duration>,
}

/// Pause before the single retry of a failed status write.
const RESULT_RETRY_DELAY: Duration = Duration::from_millis(200);

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(5),
            job_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkOutcome {
    Idle,
    Completed(i64),
    Failed { job_id: i64, error: String },
}

/// The single consumer of the job queue.
pub struct Worker {
    queue: JobQueue,
    deps: JobDependencies,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(queue: JobQueue, deps: JobDependencies, config: WorkerConfig) -> Self {
        Self { queue, deps, config }
    }

    /// Process jobs until `shutdown` flips to true or its sender goes away.
    /// Shutdown is only observed between jobs.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "👷 Background worker started (idle interval {:?}, timeout {:?})",
            self.config.idle_interval, self.config.job_timeout
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(WorkOutcome::Idle) => {}
                Ok(_) => continue,
                Err(e) => error!("Error in worker loop: {}", e),
            }

            tokio::select! {
                _ = self.queue.wait_for_work(self.config.idle_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("🛑 Background worker stopped");
    }

    /// Claim and run at most one job. Job failures are recorded on the job and
    /// reported as [`WorkOutcome::Failed`]; only queue errors are returned as `Err`.
    pub async fn run_once(&self) -> Result<WorkOutcome, AppError> {
        let Some(job) = self.queue.claim_next().await? else {
            return Ok(WorkOutcome::Idle);
        };

        info!(
            "🏃 Processing job {}: {} for tenant {}",
            job.id, job.job_type, job.tenant_id
        );
        let started = std::time::Instant::now();

        let result = self.execute(JobKind::from_tag(&job.job_type), &job).await;
        self.record_result(job.id, &result).await?;

        match result {
            Ok(()) => {
                info!(
                    "✅ Job {} completed in {}ms",
                    job.id,
                    started.elapsed().as_millis()
                );
                Ok(WorkOutcome::Completed(job.id))
            }
            Err(message) => {
                error!("❌ Job {} failed: {}", job.id, message);
                Ok(WorkOutcome::Failed {
                    job_id: job.id,
                    error: message,
                })
            }
        }
    }

    /// Persist the terminal status. A database error gets one retry after
    /// [`RESULT_RETRY_DELAY`]; if that fails too the job stays `processing`.
    async fn record_result(&self, job_id: i64, result: &Result<(), String>) -> Result<(), AppError> {
        match self.write_result(job_id, result).await {
            Err(AppError::Db(e)) => {
                warn!("Could not record result of job {}, retrying: {}", job_id, e);
                tokio::time::sleep(RESULT_RETRY_DELAY).await;
                self.write_result(job_id, result).await.map_err(|e| {
                    error!(
                        "🚨 Job {} is stuck in processing, its result could not be recorded: {}",
                        job_id, e
                    );
                    e
                })
            }
            other => other,
        }
    }

    async fn write_result(&self, job_id: i64, result: &Result<(), String>) -> Result<(), AppError> {
        match result {
            Ok(()) => self.queue.complete(job_id).await,
            Err(message) => self.queue.fail(job_id, message).await,
        }
    }

    async fn execute(&self, kind: JobKind, job: &Job) -> Result<(), String> {
        let ctx = JobContext {
            job_id: job.id,
            tenant_id: job.tenant_id,
            pool: self.deps.pool.clone(),
            cost_source: self.deps.cost_source.clone(),
            output_dir: self.deps.output_dir.clone(),
            today: (self.deps.clock)(),
        };

        // Spawned so a panic in the handler surfaces as a JoinError.
        let mut handle = tokio::spawn(dispatch(kind, ctx));

        let joined = match self.config.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    warn!("⏱️ Job {} exceeded {:?}, aborting", job.id, limit);
                    return Err(AppError::Timeout(limit).to_string());
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) if e.is_panic() => Err(format!("Job panicked: {}", panic_message(e.into_panic()))),
            Err(e) => Err(format!("Job task was cancelled: {}", e)),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
