pub mod cache_service;
pub mod inventory_service;
pub mod job_queue_service;
pub mod job_scheduler_service;
pub mod report_export;
pub mod report_service;
pub mod savings_report_service;
