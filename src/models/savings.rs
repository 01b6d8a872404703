use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cache action under which the worker stores finished reports.
pub const MONTHLY_SAVINGS_REPORT_ACTION: &str = "monthly_savings_report";

/// One row per cluster per month. Figures are fixed 2-decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsRow {
    pub clusterid: String,
    pub clustername: String,
    pub connected_date: String,
    pub month: String,
    pub cpu_provisioned: String,
    pub cpu_requested: String,
    pub cpu_used: String,
    pub cpu_price: String,
    pub ram_provisioned: String,
    pub ram_requested: String,
    pub ram_used: String,
    pub ram_price: String,
    pub storage_provisioned: String,
    pub storage_requested: String,
    pub avg_cpu_provisioned: String,
    pub avg_cpu_requested: String,
    pub avg_ram_provisioned: String,
    pub avg_ram_requested: String,
    pub avg_storage_provisioned: String,
    pub avg_storage_requested: String,
    pub savings_per_month_cpu: String,
    pub savings_per_month_ram: String,
    pub savings_per_month_storage: String,
    pub total_savings_per_month: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "RAM")]
    Ram,
    Storage,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Cpu, ResourceKind::Ram, ResourceKind::Storage];
}

/// Unit-cost breakdown for one resource of one cluster in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCostRow {
    pub cluster_id: String,
    pub cluster_name: String,
    pub connected_date: String,
    pub month: String,
    pub resource: ResourceKind,
    pub avg_hourly_cost: String,
    pub avg_daily_cost: String,
    pub avg_monthly_cost: String,
}

/// A cluster left out of the report because its connection date was unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCluster {
    pub cluster_id: String,
    pub cluster_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySavingsReport {
    pub savings: Vec<SavingsRow>,
    pub resource: Vec<ResourceCostRow>,
    #[serde(default)]
    pub skipped: Vec<SkippedCluster>,
}

/// A report read back from the cache together with when it was written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedReport {
    pub cached_at: DateTime<Utc>,
    pub monthly_savings_report: Vec<SavingsRow>,
    pub resource_costs: Vec<ResourceCostRow>,
    pub skipped_clusters: Vec<SkippedCluster>,
}

impl CachedReport {
    pub fn new(report: MonthlySavingsReport, cached_at: DateTime<Utc>) -> Self {
        Self {
            cached_at,
            monthly_savings_report: report.savings,
            resource_costs: report.resource,
            skipped_clusters: report.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_labels() {
        assert_eq!(serde_json::to_value(ResourceKind::Cpu).unwrap(), "CPU");
        assert_eq!(serde_json::to_value(ResourceKind::Ram).unwrap(), "RAM");
        assert_eq!(serde_json::to_value(ResourceKind::Storage).unwrap(), "Storage");
    }

    #[test]
    fn test_report_without_skipped_field_still_reads() {
        let report: MonthlySavingsReport =
            serde_json::from_str(r#"{"savings": [], "resource": []}"#).unwrap();
        assert!(report.skipped.is_empty());
    }
}
