use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::ReportMonth;

/// Hourly cost-per-unit figures for one cluster over one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencySummary {
    pub cost_per_cpu: f64,
    pub cost_per_ram: f64,
    pub cost_per_storage: f64,
}

/// Provisioned/requested/used totals for one cluster over one month, summed
/// across every item the API returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_provisioned: f64,
    pub cpu_requested: f64,
    pub cpu_used: f64,
    pub ram_provisioned: f64,
    pub ram_requested: f64,
    pub ram_used: f64,
    pub storage_provisioned: f64,
    pub storage_requested: f64,
}

#[derive(Debug, Error)]
pub enum CostProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad configuration: {0}")]
    Config(String),
}

/// Source of per-cluster cost data. Field-level problems in a response must
/// come back as zeros; only a failed request is an error.
#[async_trait]
pub trait CostReportSource: Send + Sync {
    async fn efficiency_summary(
        &self,
        api_key: &str,
        cluster_id: &str,
        month: &ReportMonth,
    ) -> Result<EfficiencySummary, CostProviderError>;

    async fn resource_usage(
        &self,
        api_key: &str,
        cluster_id: &str,
        month: &ReportMonth,
    ) -> Result<ResourceUsage, CostProviderError>;
}

impl EfficiencySummary {
    /// Read `summary.costPer*Provisioned` from an efficiency response body.
    pub fn from_response(body: &Value) -> Self {
        let summary = body.get("summary");
        let field = |name: &str| lenient_f64(summary.and_then(|s| s.get(name)));

        Self {
            cost_per_cpu: field("costPerCpuProvisioned"),
            cost_per_ram: field("costPerRamGibProvisioned"),
            cost_per_storage: field("costPerStorageGibProvisioned"),
        }
    }
}

impl ResourceUsage {
    /// Sum the `items[]` of a resource-usage response body.
    pub fn from_response(body: &Value) -> Self {
        let mut sums = ResourceUsage::default();
        let Some(items) = body.get("items").and_then(Value::as_array) else {
            return sums;
        };

        for item in items {
            let field = |name: &str| lenient_f64(item.get(name));
            // The preferred key wins whenever it is present, even if its value is unusable.
            let preferred = |primary: &str, fallback: &str| match item.get(primary) {
                Some(v) => lenient_f64(Some(v)),
                None => field(fallback),
            };

            sums.cpu_provisioned += field("cpuProvisioned");
            sums.cpu_requested += field("cpuRequested");
            sums.cpu_used += field("cpuUsed");
            sums.ram_provisioned += field("ramProvisioned");
            sums.ram_requested += field("ramRequested");
            sums.ram_used += field("ramUsed");
            sums.storage_provisioned += preferred("storageProvisionedGib", "storageProvisioned");
            sums.storage_requested += preferred("requestedStorageGib", "storageRequested");
        }

        sums
    }
}

/// A JSON number or numeric string; anything else counts as zero.
pub fn lenient_f64(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}
