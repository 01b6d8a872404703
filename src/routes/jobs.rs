use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::errors::AppError;
use crate::models::JobStatusView;
use crate::services::report_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:job_id", get(get_job_status))
}

/// GET /api/jobs/:job_id - Poll a background job
async fn get_job_status(
    Path(job_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<JobStatusView>, AppError> {
    info!("GET /api/jobs/{} - Job status", job_id);
    let view = report_service::get_job_status(&state.queue, job_id).await?;
    Ok(Json(view))
}
