use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::{ClusterInput, CreateOrganization, JobStatusView, Organization};
use crate::services::inventory_service;
use crate::services::report_service::{self, RefreshOutcome};
use crate::state::AppState;

const RECENT_JOBS_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/refresh/:tenant_id", post(refresh_tenant))
        .route("/refresh-all", post(refresh_all))
        .route("/jobs/purge", post(purge_jobs))
        .route("/jobs/recent", get(recent_jobs))
        .route("/organizations", post(create_organization))
        .route("/organizations/:tenant_id/enabled", put(set_enabled))
        .route("/organizations/:tenant_id/clusters", put(put_clusters))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshAllResponse {
    pub queued: usize,
    pub already_active: usize,
    pub results: Vec<RefreshOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: u64,
    pub older_than_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            enabled: org.enabled,
        }
    }
}

/// POST /api/admin/refresh/:tenant_id - Queue a report for one organization
async fn refresh_tenant(
    Path(tenant_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RefreshOutcome>), AppError> {
    info!("POST /api/admin/refresh/{}", tenant_id);
    let outcome = report_service::refresh_tenant(&state.queue, tenant_id).await?;
    let status = if outcome.created {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// POST /api/admin/refresh-all - Queue reports for every enabled organization
async fn refresh_all(State(state): State<AppState>) -> Result<Json<RefreshAllResponse>, AppError> {
    info!("POST /api/admin/refresh-all");
    let results = report_service::refresh_all(&state.queue).await?;
    let queued = results.iter().filter(|r| r.created).count();
    Ok(Json(RefreshAllResponse {
        queued,
        already_active: results.len() - queued,
        results,
    }))
}

/// POST /api/admin/jobs/purge?days=N - Delete finished jobs older than N days
async fn purge_jobs(
    Query(query): Query<PurgeQuery>,
    State(state): State<AppState>,
) -> Result<Json<PurgeResponse>, AppError> {
    let days = query.days.unwrap_or(7);
    info!("POST /api/admin/jobs/purge - days={}", days);
    if days < 0 {
        return Err(AppError::Validation("days must not be negative".to_string()));
    }
    let deleted = state.queue.purge_finished(days).await?;
    Ok(Json(PurgeResponse {
        deleted,
        older_than_days: days,
    }))
}

/// GET /api/admin/jobs/recent - Most recent jobs, newest first
async fn recent_jobs(State(state): State<AppState>) -> Result<Json<Vec<JobStatusView>>, AppError> {
    info!("GET /api/admin/jobs/recent");
    let jobs = state.queue.recent(RECENT_JOBS_LIMIT).await?;
    Ok(Json(jobs.into_iter().map(JobStatusView::from).collect()))
}

/// POST /api/admin/organizations - Register an organization
async fn create_organization(
    State(state): State<AppState>,
    Json(input): Json<CreateOrganization>,
) -> Result<(StatusCode, Json<OrganizationResponse>), AppError> {
    info!("POST /api/admin/organizations - {}", input.name);
    let org = inventory_service::create_organization(&state.pool, input).await?;
    Ok((StatusCode::CREATED, Json(org.into())))
}

/// PUT /api/admin/organizations/:tenant_id/enabled
async fn set_enabled(
    Path(tenant_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<EnabledRequest>,
) -> Result<Json<OrganizationResponse>, AppError> {
    info!("PUT /api/admin/organizations/{}/enabled - {}", tenant_id, body.enabled);
    let org = inventory_service::set_organization_enabled(&state.pool, tenant_id, body.enabled).await?;
    Ok(Json(org.into()))
}

/// PUT /api/admin/organizations/:tenant_id/clusters - Replace the cluster inventory
async fn put_clusters(
    Path(tenant_id): Path<i64>,
    State(state): State<AppState>,
    Json(clusters): Json<Vec<ClusterInput>>,
) -> Result<StatusCode, AppError> {
    info!(
        "PUT /api/admin/organizations/{}/clusters - {} clusters",
        tenant_id,
        clusters.len()
    );
    inventory_service::get_organization(&state.pool, tenant_id).await?;
    inventory_service::store_clusters(&state.pool, tenant_id, &clusters).await?;
    Ok(StatusCode::NO_CONTENT)
}
