use chrono::Duration;
use log::{debug, warn};
use sqlx::SqliteConnection;

use crate::{
    db_types::{JobOrigin, MatchJob},
    sqlite::SqliteDatabaseError,
};

pub async fn enqueue(
    quotation_id: i64,
    origin: JobOrigin,
    max_attempts: i64,
    conn: &mut SqliteConnection,
) -> Result<MatchJob, SqliteDatabaseError> {
    let job = sqlx::query_as::<_, MatchJob>(
        r#"
            INSERT INTO match_jobs (quotation_id, origin, max_attempts)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(quotation_id)
    .bind(origin)
    .bind(max_attempts)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Job #{} queued for quotation #{quotation_id} ({origin})", job.id);
    Ok(job)
}

/// Atomically claims the next due queued job. The claim is a single UPDATE, so two consumers can never grab the
/// same entry.
pub async fn claim_due(conn: &mut SqliteConnection) -> Result<Option<MatchJob>, SqliteDatabaseError> {
    let job = sqlx::query_as::<_, MatchJob>(
        r#"
            UPDATE match_jobs
            SET state = 'active', updated_at = CURRENT_TIMESTAMP
            WHERE id = (
                SELECT id FROM match_jobs
                WHERE state = 'queued' AND next_attempt_at <= CURRENT_TIMESTAMP
                ORDER BY next_attempt_at, id
                LIMIT 1
            )
            RETURNING *;
        "#,
    )
    .fetch_optional(conn)
    .await?;
    Ok(job)
}

pub async fn complete(job_id: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query("UPDATE match_jobs SET state = 'completed', updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(job_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Parks a job as `failed` without consuming its remaining attempts.
pub async fn fail(job_id: i64, error: &str, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        "UPDATE match_jobs SET state = 'failed', last_error = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(error)
    .bind(job_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Records a failed attempt. The next due time doubles with each attempt (`backoff_base × 2^(attempts-1)`); once
/// the attempts are exhausted the job is parked as `failed`.
pub async fn retry_or_fail(
    job: &MatchJob,
    error: &str,
    backoff_base: Duration,
    conn: &mut SqliteConnection,
) -> Result<MatchJob, SqliteDatabaseError> {
    let attempts = job.attempts + 1;
    let updated = if attempts >= job.max_attempts {
        warn!("🗃️ Job #{} has exhausted its {} attempts and is marked as failed", job.id, job.max_attempts);
        sqlx::query_as::<_, MatchJob>(
            r#"
                UPDATE match_jobs
                SET state = 'failed', attempts = $1, last_error = $2, updated_at = CURRENT_TIMESTAMP
                WHERE id = $3
                RETURNING *;
            "#,
        )
        .bind(attempts)
        .bind(error)
        .bind(job.id)
        .fetch_one(conn)
        .await?
    } else {
        let delay_secs = backoff_base.num_seconds().max(1) << (attempts - 1).min(16);
        sqlx::query_as::<_, MatchJob>(
            r#"
                UPDATE match_jobs
                SET state = 'queued',
                    attempts = $1,
                    last_error = $2,
                    next_attempt_at = datetime(CURRENT_TIMESTAMP, '+' || $3 || ' seconds'),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $4
                RETURNING *;
            "#,
        )
        .bind(attempts)
        .bind(error)
        .bind(delay_secs)
        .bind(job.id)
        .fetch_one(conn)
        .await?
    };
    Ok(updated)
}

/// Returns jobs left `active` by a prior crash to the queue. Run once at startup.
pub async fn reactivate_stale(conn: &mut SqliteConnection) -> Result<u64, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE match_jobs SET state = 'queued', updated_at = CURRENT_TIMESTAMP WHERE state = 'active'",
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
