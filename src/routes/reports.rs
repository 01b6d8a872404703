use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::Enqueued;
use crate::services::report_service::{self, MonthlySavingsView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:tenant_id/monthly-savings", get(get_monthly_savings))
        .route("/:tenant_id/monthly-savings/refresh", post(refresh_monthly_savings))
}

#[derive(Debug, Deserialize)]
pub struct MonthlySavingsQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub status: &'static str,
    pub job_id: i64,
    pub message: String,
}

impl EnqueueResponse {
    pub fn from_enqueued(enqueued: Enqueued) -> (StatusCode, Self) {
        match enqueued {
            Enqueued::Created(job_id) => (
                StatusCode::ACCEPTED,
                Self {
                    status: "processing",
                    job_id,
                    message: "Monthly savings report generation has been queued".to_string(),
                },
            ),
            Enqueued::AlreadyActive(job_id) => (
                StatusCode::OK,
                Self {
                    status: "processing",
                    job_id,
                    message: "A job is already in progress to generate the monthly savings report"
                        .to_string(),
                },
            ),
        }
    }
}

/// GET /api/orgs/:tenant_id/monthly-savings - Cached report, or where to find it
async fn get_monthly_savings(
    Path(tenant_id): Path<i64>,
    Query(query): Query<MonthlySavingsQuery>,
    State(state): State<AppState>,
) -> Result<Json<MonthlySavingsView>, AppError> {
    info!(
        "GET /api/orgs/{}/monthly-savings - refresh={}",
        tenant_id, query.refresh
    );
    let view = report_service::monthly_savings(&state.queue, tenant_id, query.refresh).await?;
    Ok(Json(view))
}

/// POST /api/orgs/:tenant_id/monthly-savings/refresh - Queue a new report
async fn refresh_monthly_savings(
    Path(tenant_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    info!("POST /api/orgs/{}/monthly-savings/refresh", tenant_id);
    let enqueued = report_service::enqueue_monthly_savings_job(&state.queue, tenant_id).await?;
    let (status, body) = EnqueueResponse::from_enqueued(enqueued);
    Ok((status, Json(body)))
}
