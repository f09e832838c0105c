//! Durable job queue behavior over an in-memory SQLite database.
use agromatch_engine::{
    db_types::{JobOrigin, JobState},
    sqlite::db::run_migrations,
    traits::{JobQueue, MatchingDatabase},
    SqliteDatabase,
};
use chrono::Duration;

async fn test_db() -> SqliteDatabase {
    let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("in-memory database");
    run_migrations(db.pool()).await.expect("migrations");
    let seed = [
        "INSERT INTO products (id, name, category) VALUES (1, 'Soybean', 'grain')",
        "INSERT INTO locations (id, city, country, latitude, longitude, place_id) \
         VALUES (1, 'Pergamino', 'AR', -33.9, -60.57, 'place-1')",
        "INSERT INTO quotations (id, product_id, location_id, quantity_tons, name) VALUES (1, 1, 1, 100.0, 'Seller')",
    ];
    for sql in seed {
        sqlx::query(sql).execute(db.pool()).await.expect("seed");
    }
    db
}

#[tokio::test]
async fn enqueue_and_claim_round_trip() {
    let db = test_db().await;
    let job = db.enqueue(1, JobOrigin::Enqueued, 3).await.unwrap();
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.attempts, 0);
    let claimed = db.claim_due_job().await.unwrap().expect("a due job");
    assert_eq!(claimed.id, job.id);
    assert_eq!(claimed.state, JobState::Active);
    assert!(db.claim_due_job().await.unwrap().is_none(), "an active job cannot be claimed twice");
    db.complete_job(claimed.id).await.unwrap();
    assert!(db.claim_due_job().await.unwrap().is_none());
}

#[tokio::test]
async fn failed_attempts_back_off_and_eventually_park_the_job() {
    let db = test_db().await;
    db.enqueue(1, JobOrigin::Enqueued, 3).await.unwrap();
    let job = db.claim_due_job().await.unwrap().unwrap();
    let job = db.retry_or_fail_job(&job, "transient", Duration::seconds(5)).await.unwrap();
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.attempts, 1);
    assert_eq!(job.last_error.as_deref(), Some("transient"));
    assert!(db.claim_due_job().await.unwrap().is_none(), "the backoff keeps the job out of reach");

    let job = db.retry_or_fail_job(&job, "transient", Duration::seconds(5)).await.unwrap();
    assert_eq!(job.attempts, 2);
    assert_eq!(job.state, JobState::Queued);

    let job = db.retry_or_fail_job(&job, "transient", Duration::seconds(5)).await.unwrap();
    assert_eq!(job.attempts, 3);
    assert_eq!(job.state, JobState::Failed);
    assert!(job.attempts_exhausted());
}

#[tokio::test]
async fn permanent_failures_skip_the_remaining_attempts() {
    let db = test_db().await;
    db.enqueue(1, JobOrigin::Manual, 3).await.unwrap();
    let job = db.claim_due_job().await.unwrap().unwrap();
    db.fail_job(job.id, "quotation does not exist").await.unwrap();
    assert!(db.claim_due_job().await.unwrap().is_none());
    let state = sqlx::query_scalar::<_, String>("SELECT state FROM match_jobs WHERE id = $1")
        .bind(job.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(state, "failed");
}

#[tokio::test]
async fn stale_active_jobs_are_reactivated_at_startup() {
    let db = test_db().await;
    db.enqueue(1, JobOrigin::Enqueued, 3).await.unwrap();
    let claimed = db.claim_due_job().await.unwrap().unwrap();
    // Simulates a crash: the job stays active with nobody working on it.
    let reactivated = db.reactivate_stale_jobs().await.unwrap();
    assert_eq!(reactivated, 1);
    let again = db.claim_due_job().await.unwrap().expect("the job is claimable again");
    assert_eq!(again.id, claimed.id);
}

#[tokio::test]
async fn quotations_stuck_in_processing_are_reported() {
    let db = test_db().await;
    assert!(db.stuck_quotations().await.unwrap().is_empty());
    sqlx::query("UPDATE quotations SET processing_status = 'processing' WHERE id = 1")
        .execute(db.pool())
        .await
        .unwrap();
    assert_eq!(db.stuck_quotations().await.unwrap(), vec![1]);
}
