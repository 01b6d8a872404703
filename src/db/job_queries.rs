use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{Job, JobStatus};

const JOB_COLUMNS: &str =
    "id, tenant_id, job_type, status, created_at, started_at, completed_at, error";

pub async fn insert(
    pool: &SqlitePool,
    tenant_id: i64,
    job_type: &str,
    created_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO jobs (tenant_id, job_type, status, created_at)
         VALUES (?, ?, 'pending', ?)
         RETURNING id",
    )
    .bind(tenant_id)
    .bind(job_type)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub async fn fetch_one(pool: &SqlitePool, id: i64) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The pending or processing job for a (tenant, type) pair, if any.
pub async fn fetch_active(
    pool: &SqlitePool,
    tenant_id: i64,
    job_type: &str,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs
         WHERE tenant_id = ? AND job_type = ? AND status IN ('pending', 'processing')
         ORDER BY id ASC
         LIMIT 1"
    ))
    .bind(tenant_id)
    .bind(job_type)
    .fetch_optional(pool)
    .await
}

/// Select the oldest pending job and move it to `processing` in one statement.
/// The outer `status = 'pending'` guard keeps a concurrent claimer from taking
/// the same row twice.
pub async fn claim_next(
    pool: &SqlitePool,
    started_at: DateTime<Utc>,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs
         SET status = 'processing', started_at = ?
         WHERE id = (
             SELECT id FROM jobs
             WHERE status = 'pending'
             ORDER BY created_at ASC, id ASC
             LIMIT 1
         )
         AND status = 'pending'
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(started_at)
    .fetch_optional(pool)
    .await
}

/// Move a `processing` job to a terminal state. Returns the number of rows
/// changed; zero means the job was missing or not processing.
pub async fn finish(
    pool: &SqlitePool,
    id: i64,
    status: JobStatus,
    error: Option<&str>,
    completed_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE jobs
         SET status = ?, completed_at = ?, error = ?
         WHERE id = ? AND status = 'processing'",
    )
    .bind(status.as_str())
    .bind(completed_at)
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Retention sweep: drop terminal jobs created before `cutoff`.
pub async fn delete_finished_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM jobs
         WHERE status IN ('completed', 'error') AND created_at < ?",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn fetch_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC, id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}
