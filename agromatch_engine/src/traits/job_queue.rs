use chrono::Duration;
use thiserror::Error;

use crate::db_types::{JobOrigin, MatchJob};

#[derive(Debug, Clone, Error)]
pub enum JobQueueError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for JobQueueError {
    fn from(e: sqlx::Error) -> Self {
        JobQueueError::DatabaseError(e.to_string())
    }
}

/// A durable, at-least-once job queue with one job type: "match this quotation".
///
/// Duplicate jobs for the same quotation id are independently processed (no dedup at enqueue time); the match
/// table's per-(quotation, opportunity) uniqueness is the safety net against double writes.
#[allow(async_fn_in_trait)]
pub trait JobQueue {
    /// Adds a job to the queue, due immediately. Returns the queue entry.
    async fn enqueue(&self, quotation_id: i64, origin: JobOrigin, max_attempts: i64)
        -> Result<MatchJob, JobQueueError>;

    /// Atomically claims the next due queued job (flips it to `active`), or returns `None` if nothing is due.
    async fn claim_due_job(&self) -> Result<Option<MatchJob>, JobQueueError>;

    /// Marks an active job as completed.
    async fn complete_job(&self, job_id: i64) -> Result<(), JobQueueError>;

    /// Parks a job as `failed` immediately, without consuming the remaining attempts. Used for permanent
    /// errors, where a retry cannot change the outcome.
    async fn fail_job(&self, job_id: i64, error: &str) -> Result<(), JobQueueError>;

    /// Records a failed attempt. The job goes back to `queued` with an exponentially backed-off due time, or to
    /// `failed` once its attempts are exhausted. Returns the updated job.
    async fn retry_or_fail_job(
        &self,
        job: &MatchJob,
        error: &str,
        backoff_base: Duration,
    ) -> Result<MatchJob, JobQueueError>;

    /// Returns any jobs left `active` by a prior crash to the `queued` state. Called once at startup, before the
    /// consumer loop starts. Returns the number of jobs reactivated.
    async fn reactivate_stale_jobs(&self) -> Result<u64, JobQueueError>;
}
