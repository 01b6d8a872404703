use sqlx::SqlitePool;
use tracing::info;

use crate::db::{cache_queries, organization_queries};
use crate::errors::AppError;
use crate::models::{ClusterInput, CreateOrganization, Organization};
use crate::services::cache_service;

/// Cache action holding a tenant's cluster inventory, written by the inventory sync.
pub const CLUSTER_DETAILS_ACTION: &str = "full_cluster_details";

pub async fn get_organization(pool: &SqlitePool, tenant_id: i64) -> Result<Organization, AppError> {
    organization_queries::fetch_one(pool, tenant_id)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list_enabled_organizations(pool: &SqlitePool) -> Result<Vec<Organization>, AppError> {
    Ok(organization_queries::fetch_enabled(pool).await?)
}

pub async fn create_organization(
    pool: &SqlitePool,
    input: CreateOrganization,
) -> Result<Organization, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Organization name must not be empty".to_string()));
    }
    if input.api_key.trim().is_empty() {
        return Err(AppError::Validation("API key must not be empty".to_string()));
    }

    let id = organization_queries::insert(pool, input).await?;
    info!("🏢 Created organization {}", id);
    get_organization(pool, id).await
}

pub async fn set_organization_enabled(
    pool: &SqlitePool,
    tenant_id: i64,
    enabled: bool,
) -> Result<Organization, AppError> {
    if organization_queries::set_enabled(pool, tenant_id, enabled).await? == 0 {
        return Err(AppError::NotFound);
    }
    info!("Organization {} enabled={}", tenant_id, enabled);
    get_organization(pool, tenant_id).await
}

/// Load the cluster table a report is built from. A tenant that has never had
/// its inventory synced has nothing to report on, which is an error for the job.
/// So is a stored inventory that no longer decodes.
pub async fn load_clusters(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<ClusterInput>, AppError> {
    let Some(row) = cache_queries::fetch(pool, tenant_id, CLUSTER_DETAILS_ACTION).await? else {
        return Err(AppError::Validation(format!(
            "No cluster inventory available for organization {}",
            tenant_id
        )));
    };

    serde_json::from_str(&row.data).map_err(|e| {
        AppError::Validation(format!(
            "Cluster inventory for organization {} is unreadable: {}",
            tenant_id, e
        ))
    })
}

/// Replace the cluster inventory for a tenant.
pub async fn store_clusters(
    pool: &SqlitePool,
    tenant_id: i64,
    clusters: &[ClusterInput],
) -> Result<(), AppError> {
    cache_service::set(pool, tenant_id, CLUSTER_DETAILS_ACTION, &clusters).await
}
