use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::cache_queries;
use crate::errors::AppError;

/// A decoded cache payload and the time it was last written.
#[derive(Debug, Clone)]
pub struct CacheHit<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

/// Read the payload stored for (tenant, action). A payload that no longer
/// decodes as `T` is reported as a miss.
pub async fn get<T: DeserializeOwned>(
    pool: &SqlitePool,
    tenant_id: i64,
    action: &str,
) -> Result<Option<T>, AppError> {
    Ok(get_entry(pool, tenant_id, action).await?.map(|hit| hit.data))
}

pub async fn get_entry<T: DeserializeOwned>(
    pool: &SqlitePool,
    tenant_id: i64,
    action: &str,
) -> Result<Option<CacheHit<T>>, AppError> {
    let Some(row) = cache_queries::fetch(pool, tenant_id, action).await? else {
        return Ok(None);
    };

    match serde_json::from_str::<T>(&row.data) {
        Ok(data) => Ok(Some(CacheHit {
            data,
            timestamp: row.timestamp,
        })),
        Err(e) => {
            warn!(
                "Unreadable cache entry for tenant_id={}, action={}: {}",
                tenant_id, action, e
            );
            Ok(None)
        }
    }
}

/// Replace whatever is stored for (tenant, action).
pub async fn set<T: Serialize>(
    pool: &SqlitePool,
    tenant_id: i64,
    action: &str,
    payload: &T,
) -> Result<(), AppError> {
    let data = serde_json::to_string(payload)?;
    cache_queries::upsert(pool, tenant_id, action, &data, Utc::now()).await?;
    info!("Cache updated for tenant_id={}, action={}", tenant_id, action);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::models::{MonthlySavingsReport, MONTHLY_SAVINGS_REPORT_ACTION};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let pool = connect_in_memory().await.unwrap();
        let value: Option<serde_json::Value> = get(&pool, 1, "nothing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_round_trip_empty_report() {
        let pool = connect_in_memory().await.unwrap();
        let report = MonthlySavingsReport::default();

        set(&pool, 1, MONTHLY_SAVINGS_REPORT_ACTION, &report).await.unwrap();
        let read: MonthlySavingsReport = get(&pool, 1, MONTHLY_SAVINGS_REPORT_ACTION)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read, report);
    }

    #[tokio::test]
    async fn test_last_write_wins_with_one_row() {
        let pool = connect_in_memory().await.unwrap();

        set(&pool, 7, "summary", &json!({"v": 1})).await.unwrap();
        let first = get_entry::<serde_json::Value>(&pool, 7, "summary").await.unwrap().unwrap();
        set(&pool, 7, "summary", &json!({"v": 2})).await.unwrap();

        let second = get_entry::<serde_json::Value>(&pool, 7, "summary").await.unwrap().unwrap();
        assert_eq!(second.data, json!({"v": 2}));
        assert!(second.timestamp >= first.timestamp);
        assert_eq!(cache_queries::count_for_key(&pool, 7, "summary").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_isolated_by_tenant_and_action() {
        let pool = connect_in_memory().await.unwrap();
        set(&pool, 1, "a", &json!("one-a")).await.unwrap();
        set(&pool, 2, "a", &json!("two-a")).await.unwrap();
        set(&pool, 1, "b", &json!("one-b")).await.unwrap();

        assert_eq!(get::<String>(&pool, 1, "a").await.unwrap().unwrap(), "one-a");
        assert_eq!(get::<String>(&pool, 2, "a").await.unwrap().unwrap(), "two-a");
        assert_eq!(get::<String>(&pool, 1, "b").await.unwrap().unwrap(), "one-b");
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_a_miss() {
        let pool = connect_in_memory().await.unwrap();
        cache_queries::upsert(&pool, 3, MONTHLY_SAVINGS_REPORT_ACTION, "{not json", Utc::now())
            .await
            .unwrap();

        let read: Option<MonthlySavingsReport> =
            get(&pool, 3, MONTHLY_SAVINGS_REPORT_ACTION).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_payload_is_a_miss() {
        let pool = connect_in_memory().await.unwrap();
        set(&pool, 3, MONTHLY_SAVINGS_REPORT_ACTION, &json!([1, 2, 3])).await.unwrap();

        let read: Option<MonthlySavingsReport> =
            get(&pool, 3, MONTHLY_SAVINGS_REPORT_ACTION).await.unwrap();
        assert!(read.is_none());
    }
}
