use sqlx::SqlitePool;

use crate::services::job_queue_service::JobQueue;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub queue: JobQueue,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let queue = JobQueue::new(pool.clone());
        Self { pool, queue }
    }
}
