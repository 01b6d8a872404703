//! Monthly Savings Report Job
//!
//! Builds the savings report for one organization and stores it where readers
//! look for it.
//!
//! # Processing Strategy
//!
//! 1. Load the organization (credential) and its cluster inventory
//! 2. Run the aggregation engine against the cost-report API
//! 3. Write the result to the cache under `monthly_savings_report`
//! 4. Export both tables as CSV when an output directory is configured
//!
//! Any failure aborts the job; the worker records the cause on the job row.

use tracing::info;

use crate::db::organization_queries;
use crate::errors::AppError;
use crate::jobs::JobContext;
use crate::models::MONTHLY_SAVINGS_REPORT_ACTION;
use crate::services::{cache_service, inventory_service, report_export, savings_report_service};

pub async fn run(ctx: JobContext) -> Result<(), AppError> {
    info!(
        "📊 Generating monthly savings report for tenant {} (job {})",
        ctx.tenant_id, ctx.job_id
    );

    let org = organization_queries::fetch_one(&ctx.pool, ctx.tenant_id)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!("Organization with ID {} not found", ctx.tenant_id))
        })?;

    let clusters = inventory_service::load_clusters(&ctx.pool, ctx.tenant_id).await?;
    info!("Found {} clusters for {}", clusters.len(), org.name);

    let report = savings_report_service::build_report(
        ctx.cost_source.as_ref(),
        &org.api_key,
        &clusters,
        ctx.today,
    )
    .await?;

    cache_service::set(&ctx.pool, ctx.tenant_id, MONTHLY_SAVINGS_REPORT_ACTION, &report).await?;

    if let Some(output_dir) = ctx.output_dir.clone() {
        let files = tokio::task::spawn_blocking(move || {
            report_export::export_report(&output_dir, &org, &report)
        })
        .await
        .map_err(|e| AppError::Export(format!("Export task failed: {}", e)))??;
        info!("📁 Report files: {}, {}", files.savings.display(), files.resources.display());
    }

    info!("✅ Monthly savings report ready for tenant {}", ctx.tenant_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use serde_json::json;

    use crate::db::connect_in_memory;
    use crate::external::scripted::ScriptedCostSource;
    use crate::models::{ClusterInput, CreateOrganization, MonthlySavingsReport, ReportMonth};

    fn context(pool: sqlx::SqlitePool, tenant_id: i64, output_dir: Option<std::path::PathBuf>) -> JobContext {
        let source = ScriptedCostSource::new().with_efficiency(
            "c-1",
            ReportMonth::new(2024, 1).unwrap(),
            json!({"summary": {"costPerCpuProvisioned": 0.05}}),
        );
        JobContext {
            job_id: 1,
            tenant_id,
            pool,
            cost_source: Arc::new(source),
            output_dir,
            today: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_missing_organization_fails_with_its_id() {
        let pool = connect_in_memory().await.unwrap();
        let err = run(context(pool, 42, None)).await.unwrap_err();
        assert!(err.to_string().contains("Organization with ID 42 not found"));
    }

    #[tokio::test]
    async fn test_report_is_cached_and_exported() {
        let pool = connect_in_memory().await.unwrap();
        let org = inventory_service::create_organization(
            &pool,
            CreateOrganization {
                name: "Acme Ops".into(),
                api_key: "k".into(),
            },
        )
        .await
        .unwrap();
        inventory_service::store_clusters(
            &pool,
            org.id,
            &[ClusterInput::new("c-1", "prod", Some("2024-01-15"))],
        )
        .await
        .unwrap();
        let tmp = tempfile::tempdir().unwrap();

        run(context(pool.clone(), org.id, Some(tmp.path().to_path_buf())))
            .await
            .unwrap();

        let cached: MonthlySavingsReport =
            cache_service::get(&pool, org.id, MONTHLY_SAVINGS_REPORT_ACTION)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(cached.savings.len(), 1);
        assert_eq!(cached.savings[0].month, "2024-02");
        assert!(tmp.path().join("Acme_Ops").join("Acme_Ops_savings.csv").exists());
        assert!(tmp.path().join("Acme_Ops").join("Acme_Ops_resources.csv").exists());
    }
}
