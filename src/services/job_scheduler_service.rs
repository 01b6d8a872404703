use crate::errors::AppError;
use crate::services::job_queue_service::JobQueue;
use crate::services::report_service;
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

// Context passed to maintenance job functions
#[derive(Clone)]
pub struct MaintenanceContext {
    pub queue: JobQueue,
    pub retention_days: i64,
}

/// Cron expressions (sec min hour day month weekday) for the maintenance jobs.
#[derive(Debug, Clone)]
pub struct MaintenanceSchedule {
    pub retention: String,
    /// Periodic refresh of every enabled organization's report; `None` disables it.
    pub refresh_all: Option<String>,
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: MaintenanceContext,
}

impl JobSchedulerService {
    pub async fn new(context: MaintenanceContext) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self { scheduler, context })
    }

    /// Start all scheduled jobs
    pub async fn start(&mut self, schedule: &MaintenanceSchedule) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");
        let mut scheduled = 0;

        self.schedule_job(
            &schedule.retention,
            "purge_finished_jobs",
            "Retention sweep of finished jobs",
            purge_finished_jobs,
        )
        .await?;
        scheduled += 1;

        if let Some(refresh) = &schedule.refresh_all {
            self.schedule_job(
                refresh,
                "refresh_all_reports",
                "Queue savings reports for all organizations",
                refresh_all_reports,
            )
            .await?;
            scheduled += 1;
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Job scheduler started successfully with {} jobs", scheduled);
        Ok(())
    }

    /// Stop the scheduler gracefully
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }

    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &str,
        job_name: &'static str,
        description: &str,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(MaintenanceContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job_fn = Arc::new(job_fn);

        let job = Job::new_async(schedule, move |_uuid, _l| {
            let context = context.clone();
            let job_fn = job_fn.clone();
            Box::pin(async move {
                execute_job_with_tracking(job_name, context, job_fn).await;
            })
        })
        .map_err(|e| AppError::External(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add job {}: {}", job_name, e)))?;

        info!("📅 Scheduled: {} - {} [cron: {}]", job_name, description, schedule);
        Ok(())
    }
}

// Job tracking wrapper
async fn execute_job_with_tracking<F, Fut>(
    job_name: &str,
    context: MaintenanceContext,
    job_fn: Arc<F>,
) -> Option<JobResult>
where
    F: Fn(MaintenanceContext) -> Fut,
    Fut: std::future::Future<Output = Result<JobResult, AppError>>,
{
    info!("🏃 Starting job: {}", job_name);
    let started_at = Utc::now();

    let result = job_fn(context).await;
    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(job_result) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );
            Some(job_result)
        }
        Err(e) => {
            error!("❌ Job failed: {} - {}", job_name, e);
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

pub async fn purge_finished_jobs(ctx: MaintenanceContext) -> Result<JobResult, AppError> {
    info!("🗑️ Purging finished jobs older than {} days...", ctx.retention_days);
    let deleted = ctx.queue.purge_finished(ctx.retention_days).await?;
    Ok(JobResult {
        items_processed: deleted as i32,
        items_failed: 0,
    })
}

pub async fn refresh_all_reports(ctx: MaintenanceContext) -> Result<JobResult, AppError> {
    info!("🔄 Queueing savings reports for all organizations...");
    let outcomes = report_service::refresh_all(&ctx.queue).await?;
    let created = outcomes.iter().filter(|o| o.created).count();
    Ok(JobResult {
        items_processed: created as i32,
        items_failed: 0,
    })
}
