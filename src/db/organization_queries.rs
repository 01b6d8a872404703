use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{CreateOrganization, Organization};

pub async fn fetch_one(pool: &SqlitePool, id: i64) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        "SELECT id, name, api_key, enabled, created_at
         FROM organizations
         WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_enabled(pool: &SqlitePool) -> Result<Vec<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        "SELECT id, name, api_key, enabled, created_at
         FROM organizations
         WHERE enabled = 1
         ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn insert(pool: &SqlitePool, input: CreateOrganization) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO organizations (name, api_key, enabled, created_at)
         VALUES (?, ?, 1, ?)
         RETURNING id",
    )
    .bind(input.name)
    .bind(input.api_key)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn set_enabled(pool: &SqlitePool, id: i64, enabled: bool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE organizations SET enabled = ? WHERE id = ?")
        .bind(enabled)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
