use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct CacheRow {
    pub tenant_id: i64,
    pub action: String,
    pub data: String,
    pub timestamp: DateTime<Utc>,
}

pub async fn fetch(
    pool: &SqlitePool,
    tenant_id: i64,
    action: &str,
) -> Result<Option<CacheRow>, sqlx::Error> {
    sqlx::query_as::<_, CacheRow>(
        "SELECT tenant_id, action, data, timestamp
         FROM cache
         WHERE tenant_id = ? AND action = ?",
    )
    .bind(tenant_id)
    .bind(action)
    .fetch_optional(pool)
    .await
}

/// Single-statement upsert; the last writer for a key wins.
pub async fn upsert(
    pool: &SqlitePool,
    tenant_id: i64,
    action: &str,
    data: &str,
    timestamp: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cache (tenant_id, action, data, timestamp)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(tenant_id, action) DO UPDATE SET
           data = excluded.data,
           timestamp = excluded.timestamp",
    )
    .bind(tenant_id)
    .bind(action)
    .bind(data)
    .bind(timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn count_for_key(
    pool: &SqlitePool,
    tenant_id: i64,
    action: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cache WHERE tenant_id = ? AND action = ?")
        .bind(tenant_id)
        .bind(action)
        .fetch_one(pool)
        .await
}
