//! Background Jobs Module
//!
//! Jobs are rows in the `jobs` table, produced by the HTTP layer and the
//! maintenance scheduler, and executed one at a time by the [`worker::Worker`].
//!
//! # Available Jobs
//!
//! - `monthly_savings_report` - Builds the per-cluster monthly savings and
//!   resource cost tables, caches them and exports them as CSV
//!
//! # Job Architecture
//!
//! - Every job gets a fresh [`JobContext`]; nothing is shared through globals
//! - The job type tag is resolved through [`JobKind`] and every job goes
//!   through [`dispatch`]; a tag with no handler fails the job instead of
//!   stopping the worker
//! - Handlers return `Result<(), AppError>`; the worker records the outcome

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::external::cost_provider::CostReportSource;

pub mod monthly_savings_report_job;
pub mod worker;

/// Handler selected by a job's type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    MonthlySavingsReport,
    Unrecognized(String),
}

impl JobKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "monthly_savings_report" => JobKind::MonthlySavingsReport,
            other => JobKind::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobKind::MonthlySavingsReport => "monthly_savings_report",
            JobKind::Unrecognized(tag) => tag,
        }
    }
}

/// Source of "today" for report cutoffs.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().date_naive())
}

/// Everything a single job run needs.
#[derive(Clone)]
pub struct JobContext {
    pub job_id: i64,
    pub tenant_id: i64,
    pub pool: SqlitePool,
    pub cost_source: Arc<dyn CostReportSource>,
    /// Where CSV exports go; `None` disables export.
    pub output_dir: Option<PathBuf>,
    pub today: NaiveDate,
}

/// Run the handler for `kind`. An unrecognized tag resolves to an immediate
/// [`AppError::UnknownJobType`].
pub fn dispatch(kind: JobKind, ctx: JobContext) -> BoxFuture<'static, Result<(), AppError>> {
    match kind {
        JobKind::MonthlySavingsReport => monthly_savings_report_job::run(ctx).boxed(),
        JobKind::Unrecognized(tag) => async move { Err(AppError::UnknownJobType(tag)) }.boxed(),
    }
}
