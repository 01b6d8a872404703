use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::external::cost_provider::{
    CostProviderError, CostReportSource, EfficiencySummary, ResourceUsage,
};
use crate::models::ReportMonth;

pub const DEFAULT_BASE_URL: &str = "https://api.cast.ai";

/// Cost-reports API client. Credentials are per tenant, so the key is passed
/// on every call rather than held by the client.
pub struct CastAiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl CastAiClient {
    pub fn new(base_url: &str) -> Result<Self, CostProviderError> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| CostProviderError::Config(format!("invalid base url '{}': {}", base_url, e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, cluster_id: &str, report: &str) -> Result<Url, CostProviderError> {
        self.base_url
            .join(&format!("v1/cost-reports/clusters/{}/{}", cluster_id, report))
            .map_err(|e| CostProviderError::Config(e.to_string()))
    }

    /// GET a report for one month. A body that is not JSON comes back as
    /// `Value::Null`, which the parsers read as all zeros.
    async fn get_report(
        &self,
        api_key: &str,
        cluster_id: &str,
        report: &str,
        month: &ReportMonth,
    ) -> Result<Value, CostProviderError> {
        let url = self.endpoint(cluster_id, report)?;
        let start = month.start_param();
        let end = month.end_param();

        debug!("GET {} for {} ({})", report, cluster_id, month);

        let resp = self
            .client
            .get(url)
            .query(&[("startTime", start.as_str()), ("endTime", end.as_str())])
            .header("accept", "application/json")
            .header("X-API-Key", api_key)
            .send()
            .await
            .map_err(|e| CostProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("{} for {} ({}) returned HTTP {}", report, cluster_id, month, status);
        }

        match resp.json::<Value>().await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!("Error decoding {} data for {}: {}", report, cluster_id, e);
                Ok(Value::Null)
            }
        }
    }
}

#[async_trait]
impl CostReportSource for CastAiClient {
    async fn efficiency_summary(
        &self,
        api_key: &str,
        cluster_id: &str,
        month: &ReportMonth,
    ) -> Result<EfficiencySummary, CostProviderError> {
        let body = self.get_report(api_key, cluster_id, "efficiency", month).await?;
        Ok(EfficiencySummary::from_response(&body))
    }

    async fn resource_usage(
        &self,
        api_key: &str,
        cluster_id: &str,
        month: &ReportMonth,
    ) -> Result<ResourceUsage, CostProviderError> {
        let body = self.get_report(api_key, cluster_id, "resource-usage", month).await?;
        Ok(ResourceUsage::from_response(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = CastAiClient::new("https://proxy.internal/castai").unwrap();
        let url = client.endpoint("abc-123", "efficiency").unwrap();
        assert_eq!(
            url.as_str(),
            "https://proxy.internal/castai/v1/cost-reports/clusters/abc-123/efficiency"
        );
    }

    #[test]
    fn test_default_base_url() {
        let client = CastAiClient::new(DEFAULT_BASE_URL).unwrap();
        let url = client.endpoint("c", "resource-usage").unwrap();
        assert_eq!(url.as_str(), "https://api.cast.ai/v1/cost-reports/clusters/c/resource-usage");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(CastAiClient::new("not a url").is_err());
    }
}
