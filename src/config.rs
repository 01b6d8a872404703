use std::path::PathBuf;
use std::time::Duration;

use crate::external::castai::DEFAULT_BASE_URL;
use crate::jobs::worker::WorkerConfig;
use crate::services::job_scheduler_service::MaintenanceSchedule;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub cost_api_base_url: String,
    pub worker_idle_secs: u64,
    pub job_timeout_secs: Option<u64>,
    pub report_output_dir: Option<PathBuf>,
    pub job_retention_days: i64,
    pub scheduler_enabled: bool,
    pub retention_schedule: String,
    pub refresh_schedule: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://fleet_savings.db?mode=rwc".to_string()),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            cost_api_base_url: non_empty("COST_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            worker_idle_secs: non_empty("WORKER_IDLE_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            job_timeout_secs: non_empty("JOB_TIMEOUT_SECS").and_then(|v| v.parse().ok()),
            // An explicitly empty REPORT_OUTPUT_DIR turns CSV export off.
            report_output_dir: match lookup("REPORT_OUTPUT_DIR") {
                Some(dir) if dir.trim().is_empty() => None,
                Some(dir) => Some(PathBuf::from(dir)),
                None => Some(PathBuf::from("outputs")),
            },
            job_retention_days: non_empty("JOB_RETENTION_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            scheduler_enabled: non_empty("JOB_SCHEDULER_ENABLED")
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            retention_schedule: non_empty("RETENTION_SCHEDULE")
                .unwrap_or_else(|| "0 0 3 * * *".to_string()),
            refresh_schedule: non_empty("REFRESH_SCHEDULE"),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.worker_idle_secs == 0 {
            return Err("WORKER_IDLE_SECS must be at least 1".to_string());
        }
        if self.job_retention_days < 0 {
            return Err("JOB_RETENTION_DAYS must not be negative".to_string());
        }
        if self.job_timeout_secs == Some(0) {
            return Err("JOB_TIMEOUT_SECS must be at least 1 when set".to_string());
        }
        Ok(())
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            idle_interval: Duration::from_secs(self.worker_idle_secs),
            job_timeout: self.job_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn maintenance_schedule(&self) -> MaintenanceSchedule {
        MaintenanceSchedule {
            retention: self.retention_schedule.clone(),
            refresh_all: self.refresh_schedule.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.database_url, "sqlite://fleet_savings.db?mode=rwc");
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.cost_api_base_url, "https://api.cast.ai");
        assert_eq!(cfg.worker_idle_secs, 5);
        assert_eq!(cfg.job_timeout_secs, None);
        assert_eq!(cfg.report_output_dir, Some(PathBuf::from("outputs")));
        assert_eq!(cfg.job_retention_days, 7);
        assert!(cfg.scheduler_enabled);
        assert_eq!(cfg.refresh_schedule, None);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.worker_config().idle_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let cfg = config(&[
            ("WORKER_IDLE_SECS", "abc"),
            ("JOB_TIMEOUT_SECS", "600"),
            ("REPORT_OUTPUT_DIR", ""),
            ("JOB_SCHEDULER_ENABLED", "false"),
            ("REFRESH_SCHEDULE", "0 0 1 1 * *"),
        ]);
        assert_eq!(cfg.worker_idle_secs, 5);
        assert_eq!(cfg.worker_config().job_timeout, Some(Duration::from_secs(600)));
        assert_eq!(cfg.report_output_dir, None);
        assert!(!cfg.scheduler_enabled);
        assert_eq!(
            cfg.maintenance_schedule().refresh_all.as_deref(),
            Some("0 0 1 1 * *")
        );
    }

    #[test]
    fn test_validate_rejects_zero_idle() {
        let cfg = config(&[("WORKER_IDLE_SECS", "0")]);
        assert!(cfg.validate().is_err());
    }
}
