//! Producer-side operations: ask for a report, poll a job, read a cached result.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::jobs::JobKind;
use crate::models::{
    CachedReport, Enqueued, JobStatusView, MonthlySavingsReport, MONTHLY_SAVINGS_REPORT_ACTION,
};
use crate::services::cache_service;
use crate::services::inventory_service;
use crate::services::job_queue_service::JobQueue;

/// What a reader of the monthly savings endpoint gets back.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MonthlySavingsView {
    Ready(CachedReport),
    Processing {
        #[serde(rename = "jobId")]
        job_id: i64,
        message: String,
    },
    NeedsRefresh {
        message: String,
    },
}

/// Outcome of a refresh request for one tenant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub tenant_id: i64,
    pub job_id: i64,
    pub created: bool,
}

impl RefreshOutcome {
    fn new(tenant_id: i64, enqueued: Enqueued) -> Self {
        Self {
            tenant_id,
            job_id: enqueued.job_id(),
            created: enqueued.is_created(),
        }
    }
}

/// Queue a savings report for the tenant unless one is already pending or running.
pub async fn enqueue_monthly_savings_job(
    queue: &JobQueue,
    tenant_id: i64,
) -> Result<Enqueued, AppError> {
    inventory_service::get_organization(queue.pool(), tenant_id).await?;

    let job_type = JobKind::MonthlySavingsReport.as_str();
    if let Some(active) = queue.active_job(tenant_id, job_type).await? {
        info!(
            "Savings report for tenant {} already in progress (job {})",
            tenant_id, active.id
        );
        return Ok(Enqueued::AlreadyActive(active.id));
    }

    queue.enqueue(tenant_id, job_type).await
}

pub async fn get_job_status(queue: &JobQueue, job_id: i64) -> Result<JobStatusView, AppError> {
    queue
        .status(job_id)
        .await?
        .map(JobStatusView::from)
        .ok_or(AppError::NotFound)
}

pub async fn get_cached_report(
    pool: &SqlitePool,
    tenant_id: i64,
) -> Result<Option<CachedReport>, AppError> {
    let hit = cache_service::get_entry::<MonthlySavingsReport>(
        pool,
        tenant_id,
        MONTHLY_SAVINGS_REPORT_ACTION,
    )
    .await?;
    Ok(hit.map(|hit| CachedReport::new(hit.data, hit.timestamp)))
}

/// Serve the cached report if there is one. With `force_refresh` the cache is
/// bypassed and a new job is queued (or the active one reported).
pub async fn monthly_savings(
    queue: &JobQueue,
    tenant_id: i64,
    force_refresh: bool,
) -> Result<MonthlySavingsView, AppError> {
    inventory_service::get_organization(queue.pool(), tenant_id).await?;

    if !force_refresh {
        if let Some(report) = get_cached_report(queue.pool(), tenant_id).await? {
            return Ok(MonthlySavingsView::Ready(report));
        }
        if let Some(active) = queue
            .active_job(tenant_id, JobKind::MonthlySavingsReport.as_str())
            .await?
        {
            return Ok(MonthlySavingsView::Processing {
                job_id: active.id,
                message: "A job is already in progress to generate the monthly savings report"
                    .to_string(),
            });
        }
        return Ok(MonthlySavingsView::NeedsRefresh {
            message: "No cached report; request a refresh to generate one".to_string(),
        });
    }

    let enqueued = enqueue_monthly_savings_job(queue, tenant_id).await?;
    let message = match enqueued {
        Enqueued::Created(_) => "Monthly savings report generation has been queued",
        Enqueued::AlreadyActive(_) => {
            "A job is already in progress to generate the monthly savings report"
        }
    };
    Ok(MonthlySavingsView::Processing {
        job_id: enqueued.job_id(),
        message: message.to_string(),
    })
}

/// Queue a report for every enabled organization. One tenant failing to
/// enqueue does not stop the others.
pub async fn refresh_all(queue: &JobQueue) -> Result<Vec<RefreshOutcome>, AppError> {
    let orgs = inventory_service::list_enabled_organizations(queue.pool()).await?;
    info!("🔄 Refreshing savings reports for {} organizations", orgs.len());

    let mut outcomes = Vec::with_capacity(orgs.len());
    for org in orgs {
        match enqueue_monthly_savings_job(queue, org.id).await {
            Ok(enqueued) => outcomes.push(RefreshOutcome::new(org.id, enqueued)),
            Err(e) => warn!("❌ Failed to queue report for {} ({}): {}", org.name, org.id, e),
        }
    }
    Ok(outcomes)
}

pub async fn refresh_tenant(queue: &JobQueue, tenant_id: i64) -> Result<RefreshOutcome, AppError> {
    let enqueued = enqueue_monthly_savings_job(queue, tenant_id).await?;
    Ok(RefreshOutcome::new(tenant_id, enqueued))
}
