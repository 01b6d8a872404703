//! Monthly savings aggregation.
//!
//! For every cluster the engine takes a baseline unit price from the month the
//! cluster was connected, then walks each fully-elapsed month after it, pricing
//! the average daily requested capacity at `baseline - current` unit cost.
//!
//! # Pricing
//!
//! The API reports hourly cost-per-unit. Both the baseline and the current
//! price are projected to a full month (`hourly * 24 * days_in_month`), so the
//! savings figure reflects a change in unit price applied to requested
//! capacity rather than a change in total spend.
//!
//! # Degradation
//!
//! Unusable fields arrive as `0.0` from the parsers and flow through the
//! arithmetic unchanged. Clusters without a usable connection date are skipped
//! and listed in the report. A request that cannot be sent at all aborts the
//! report.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::external::cost_provider::{CostReportSource, EfficiencySummary, ResourceUsage};
use crate::models::{
    ClusterInput, MonthlySavingsReport, ReportMonth, ResourceCostRow, ResourceKind, SavingsRow,
    SkippedCluster,
};

const CONNECTED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Full-month cost per unit of each resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyUnitCost {
    pub cpu: f64,
    pub ram: f64,
    pub storage: f64,
}

impl MonthlyUnitCost {
    pub fn project(summary: &EfficiencySummary, month: &ReportMonth) -> Self {
        let hours = 24.0 * month.days() as f64;
        Self {
            cpu: summary.cost_per_cpu * hours,
            ram: summary.cost_per_ram * hours,
            storage: summary.cost_per_storage * hours,
        }
    }
}

/// A cluster whose connection date parsed.
#[derive(Debug, Clone)]
struct DatedCluster<'a> {
    input: &'a ClusterInput,
    connected_text: &'a str,
    connected: NaiveDate,
}

/// Build the savings and resource-cost tables for every cluster.
///
/// `today` fixes the cutoff: only months strictly before the month containing
/// `today` are reported.
pub async fn build_report(
    source: &dyn CostReportSource,
    api_key: &str,
    clusters: &[ClusterInput],
    today: NaiveDate,
) -> Result<MonthlySavingsReport, AppError> {
    let (mut dated, skipped) = partition_by_connected_date(clusters);
    // Stable, so clusters connected on the same day keep inventory order.
    dated.sort_by_key(|c| c.connected);

    let last_completed = ReportMonth::last_completed(today);
    let mut report = MonthlySavingsReport {
        skipped,
        ..Default::default()
    };

    for cluster in &dated {
        info!("Processing {} - {}", cluster.input.cluster_id, cluster.input.name());
        let cluster_id = cluster.input.cluster_id.as_str();
        let connected_month = ReportMonth::containing(cluster.connected);

        let baseline_summary = source
            .efficiency_summary(api_key, cluster_id, &connected_month)
            .await?;
        let baseline = MonthlyUnitCost::project(&baseline_summary, &connected_month);

        // The connection month is the baseline itself; reporting starts the month after.
        for month in connected_month.next().through(last_completed) {
            let current = source.efficiency_summary(api_key, cluster_id, &month).await?;
            let usage = source.resource_usage(api_key, cluster_id, &month).await?;

            report
                .savings
                .push(savings_row(cluster, &month, &baseline, &current, &usage));
            report
                .resource
                .extend(resource_cost_rows(cluster, &month, &current));
        }
    }

    info!(
        "Savings report built: {} clusters, {} savings rows, {} skipped",
        dated.len(),
        report.savings.len(),
        report.skipped.len()
    );
    Ok(report)
}

fn partition_by_connected_date(clusters: &[ClusterInput]) -> (Vec<DatedCluster<'_>>, Vec<SkippedCluster>) {
    let mut dated = Vec::with_capacity(clusters.len());
    let mut skipped = Vec::new();

    for input in clusters {
        let Some(text) = input.connected_date_text() else {
            warn!(
                "Skipping cluster {} ({}) due to missing Connected Date",
                input.cluster_id,
                input.name()
            );
            skipped.push(SkippedCluster {
                cluster_id: input.cluster_id.clone(),
                cluster_name: input.name().to_string(),
                reason: "missing Connected Date".to_string(),
            });
            continue;
        };

        match NaiveDate::parse_from_str(text.trim(), CONNECTED_DATE_FORMAT) {
            Ok(connected) => dated.push(DatedCluster {
                input,
                connected_text: text,
                connected,
            }),
            Err(e) => {
                warn!(
                    "Error parsing Connected Date '{}' for {}: {}",
                    text, input.cluster_id, e
                );
                skipped.push(SkippedCluster {
                    cluster_id: input.cluster_id.clone(),
                    cluster_name: input.name().to_string(),
                    reason: format!("unparseable Connected Date '{}'", text),
                });
            }
        }
    }

    (dated, skipped)
}

fn savings_row(
    cluster: &DatedCluster<'_>,
    month: &ReportMonth,
    baseline: &MonthlyUnitCost,
    current_summary: &EfficiencySummary,
    usage: &ResourceUsage,
) -> SavingsRow {
    let days = month.days() as f64;
    let current = MonthlyUnitCost::project(current_summary, month);

    let avg_cpu_requested = usage.cpu_requested / days;
    let avg_ram_requested = usage.ram_requested / days;
    let avg_storage_requested = usage.storage_requested / days;

    // Negative when unit prices rose after onboarding; kept as-is.
    let savings_cpu = avg_cpu_requested * (baseline.cpu - current.cpu);
    let savings_ram = avg_ram_requested * (baseline.ram - current.ram);
    let savings_storage = avg_storage_requested * (baseline.storage - current.storage);
    let total = savings_cpu + savings_ram + savings_storage;

    debug!(
        "{} {}: savings cpu={:.2} ram={:.2} storage={:.2}",
        cluster.input.cluster_id, month, savings_cpu, savings_ram, savings_storage
    );

    SavingsRow {
        clusterid: cluster.input.cluster_id.clone(),
        clustername: cluster.input.name().to_string(),
        connected_date: cluster.connected_text.to_string(),
        month: month.to_string(),
        cpu_provisioned: fixed2(usage.cpu_provisioned),
        cpu_requested: fixed2(usage.cpu_requested),
        cpu_used: fixed2(usage.cpu_used),
        cpu_price: fixed2(current.cpu),
        ram_provisioned: fixed2(usage.ram_provisioned),
        ram_requested: fixed2(usage.ram_requested),
        ram_used: fixed2(usage.ram_used),
        ram_price: fixed2(current.ram),
        storage_provisioned: fixed2(usage.storage_provisioned),
        storage_requested: fixed2(usage.storage_requested),
        avg_cpu_provisioned: fixed2(usage.cpu_provisioned / days),
        avg_cpu_requested: fixed2(avg_cpu_requested),
        avg_ram_provisioned: fixed2(usage.ram_provisioned / days),
        avg_ram_requested: fixed2(avg_ram_requested),
        avg_storage_provisioned: fixed2(usage.storage_provisioned / days),
        avg_storage_requested: fixed2(avg_storage_requested),
        savings_per_month_cpu: fixed2(savings_cpu),
        savings_per_month_ram: fixed2(savings_ram),
        savings_per_month_storage: fixed2(savings_storage),
        total_savings_per_month: fixed2(total),
    }
}

fn resource_cost_rows(
    cluster: &DatedCluster<'_>,
    month: &ReportMonth,
    summary: &EfficiencySummary,
) -> Vec<ResourceCostRow> {
    let days = month.days() as f64;

    ResourceKind::ALL
        .iter()
        .map(|&resource| {
            let hourly = match resource {
                ResourceKind::Cpu => summary.cost_per_cpu,
                ResourceKind::Ram => summary.cost_per_ram,
                ResourceKind::Storage => summary.cost_per_storage,
            };
            let daily = hourly * 24.0;
            ResourceCostRow {
                cluster_id: cluster.input.cluster_id.clone(),
                cluster_name: cluster.input.name().to_string(),
                connected_date: cluster.connected_text.to_string(),
                month: month.to_string(),
                resource,
                avg_hourly_cost: format!("{:.4}", hourly),
                avg_daily_cost: format!("{:.4}", daily),
                avg_monthly_cost: fixed2(daily * days),
            }
        })
        .collect()
}

fn fixed2(value: f64) -> String {
    format!("{:.2}", value)
}
