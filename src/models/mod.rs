mod job;
mod organization;
mod report_month;
mod savings;

pub use job::{Enqueued, Job, JobStatus, JobStatusView, ParseJobStatusError};
pub use organization::{ClusterInput, CreateOrganization, Organization};
pub use report_month::ReportMonth;
pub use savings::{
    CachedReport, MonthlySavingsReport, ResourceCostRow, ResourceKind, SavingsRow, SkippedCluster,
    MONTHLY_SAVINGS_REPORT_ACTION,
};
