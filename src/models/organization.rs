use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tenant whose clusters are reported on. `api_key` is the cost-report API credential.
#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Directory name used for exported files. Always a single path
    /// component: separators and `..` are replaced.
    pub fn folder_name(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        let name = name.replace("..", "_");
        if name.is_empty() || name == "." {
            format!("org_{}", self.id)
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub api_key: String,
}

/// One entry of a tenant's cluster inventory, as materialized by the inventory sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInput {
    #[serde(rename = "ClusterID")]
    pub cluster_id: String,
    #[serde(rename = "Cluster Name", default)]
    pub cluster_name: Option<String>,
    /// `YYYY-MM-DD`; anything else (including null) means the cluster is skipped.
    #[serde(rename = "Connected Date", default)]
    pub connected_date: Option<serde_json::Value>,
}

impl ClusterInput {
    pub fn new(cluster_id: &str, cluster_name: &str, connected_date: Option<&str>) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            cluster_name: Some(cluster_name.to_string()),
            connected_date: connected_date.map(|d| serde_json::Value::String(d.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        self.cluster_name.as_deref().unwrap_or("")
    }

    pub fn connected_date_text(&self) -> Option<&str> {
        match &self.connected_date {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}
