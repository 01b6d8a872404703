//! In-memory cost source that replays canned API bodies.
//!
//! Bodies go through the same parsers as live responses, so malformed fields
//! behave exactly as they would against the real API. Months with no body
//! registered read as an empty response (all zeros).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::external::cost_provider::{
    CostProviderError, CostReportSource, EfficiencySummary, ResourceUsage,
};
use crate::models::ReportMonth;

#[derive(Default)]
pub struct ScriptedCostSource {
    efficiency: HashMap<(String, ReportMonth), Value>,
    usage: HashMap<(String, ReportMonth), Value>,
    unreachable: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedCostSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_efficiency(mut self, cluster_id: &str, month: ReportMonth, body: Value) -> Self {
        self.efficiency.insert((cluster_id.to_string(), month), body);
        self
    }

    pub fn with_usage(mut self, cluster_id: &str, month: ReportMonth, body: Value) -> Self {
        self.usage.insert((cluster_id.to_string(), month), body);
        self
    }

    /// Every request for this cluster fails as if the network were down.
    pub fn with_unreachable(mut self, cluster_id: &str) -> Self {
        self.unreachable.insert(cluster_id.to_string());
        self
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(
        &self,
        table: &HashMap<(String, ReportMonth), Value>,
        cluster_id: &str,
        month: &ReportMonth,
    ) -> Result<Value, CostProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.contains(cluster_id) {
            return Err(CostProviderError::Network(format!(
                "connection refused for cluster {}",
                cluster_id
            )));
        }
        Ok(table
            .get(&(cluster_id.to_string(), *month))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[async_trait]
impl CostReportSource for ScriptedCostSource {
    async fn efficiency_summary(
        &self,
        _api_key: &str,
        cluster_id: &str,
        month: &ReportMonth,
    ) -> Result<EfficiencySummary, CostProviderError> {
        let body = self.answer(&self.efficiency, cluster_id, month).await?;
        Ok(EfficiencySummary::from_response(&body))
    }

    async fn resource_usage(
        &self,
        _api_key: &str,
        cluster_id: &str,
        month: &ReportMonth,
    ) -> Result<ResourceUsage, CostProviderError> {
        let body = self.answer(&self.usage, cluster_id, month).await?;
        Ok(ResourceUsage::from_response(&body))
    }
}
