use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{MonthlySavingsReport, Organization, ResourceCostRow, SavingsRow};

/// A row type with a fixed CSV header, written even when there are no rows.
/// Column order must match the struct's field order.
pub trait CsvTable: Serialize {
    const HEADERS: &'static [&'static str];
}

impl CsvTable for SavingsRow {
    const HEADERS: &'static [&'static str] = &[
        "clusterid",
        "clustername",
        "connected_date",
        "month",
        "cpu_provisioned",
        "cpu_requested",
        "cpu_used",
        "cpu_price",
        "ram_provisioned",
        "ram_requested",
        "ram_used",
        "ram_price",
        "storage_provisioned",
        "storage_requested",
        "avg_cpu_provisioned",
        "avg_cpu_requested",
        "avg_ram_provisioned",
        "avg_ram_requested",
        "avg_storage_provisioned",
        "avg_storage_requested",
        "savings_per_month_cpu",
        "savings_per_month_ram",
        "savings_per_month_storage",
        "total_savings_per_month",
    ];
}

impl CsvTable for ResourceCostRow {
    const HEADERS: &'static [&'static str] = &[
        "cluster_id",
        "cluster_name",
        "connected_date",
        "month",
        "resource",
        "avg_hourly_cost",
        "avg_daily_cost",
        "avg_monthly_cost",
    ];
}

/// Files written for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFiles {
    pub savings: PathBuf,
    pub resources: PathBuf,
}

/// Write both tables as CSV under `{output_dir}/{org folder}/`. Blocking; call
/// from `spawn_blocking` inside async code.
pub fn export_report(
    output_dir: &Path,
    org: &Organization,
    report: &MonthlySavingsReport,
) -> Result<ExportedFiles, AppError> {
    let folder = org.folder_name();
    let dir = output_dir.join(&folder);
    fs::create_dir_all(&dir)?;

    let files = ExportedFiles {
        savings: dir.join(format!("{}_savings.csv", folder)),
        resources: dir.join(format!("{}_resources.csv", folder)),
    };

    write_rows(&files.savings, &report.savings)?;
    write_rows(&files.resources, &report.resource)?;

    info!(
        "💾 Exported {} savings rows and {} resource rows to {}",
        report.savings.len(),
        report.resource.len(),
        dir.display()
    );
    Ok(files)
}

fn write_rows<T: CsvTable>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
