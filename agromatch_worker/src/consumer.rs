//! The queue consumer loop.
use agromatch_engine::{
    db_types::{JobOrigin, MatchJob, QuotationStatus},
    matching::{Clock, MatchFlowApi, RoutingProvider},
    traits::{JobQueue, MatchingDatabase, RateStore, RouteStore},
};
use chrono::Duration;
use log::*;

/// Polls the durable queue and runs the match flow for every claimed job, one at a time. Retries and backoff
/// are queue-level concerns; a job failure marks the quotation as failed exactly once and never re-opens it.
pub struct QueueConsumer<B, P, K>
where
    B: MatchingDatabase + RouteStore + RateStore + JobQueue + Clone,
    P: RoutingProvider,
    K: Clock,
{
    api: MatchFlowApi<B, P, K>,
    poll_interval: std::time::Duration,
    retry_backoff: Duration,
}

impl<B, P, K> QueueConsumer<B, P, K>
where
    B: MatchingDatabase + RouteStore + RateStore + JobQueue + Clone,
    P: RoutingProvider,
    K: Clock,
{
    pub fn new(api: MatchFlowApi<B, P, K>, poll_interval_seconds: u64, retry_backoff: Duration) -> Self {
        Self { api, poll_interval: std::time::Duration::from_secs(poll_interval_seconds.max(1)), retry_backoff }
    }

    /// Runs forever. Drains every due job, then sleeps until the next poll tick.
    pub async fn run(self) {
        let mut timer = tokio::time::interval(self.poll_interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("🕰️ Match queue consumer started (polling every {:?})", self.poll_interval);
        loop {
            timer.tick().await;
            loop {
                match self.api.db().claim_due_job().await {
                    Ok(Some(job)) => self.process_job(&job).await,
                    Ok(None) => break,
                    Err(e) => {
                        error!("🕰️ Could not claim a job from the queue: {e}");
                        break;
                    },
                }
            }
        }
    }

    async fn process_job(&self, job: &MatchJob) {
        debug!("🕰️ Picked up job #{} for quotation #{} (attempt {} of {})", job.id, job.quotation_id,
            job.attempts + 1, job.max_attempts);
        match self.api.process_quotation(job.quotation_id).await {
            Ok(outcome) => {
                if let Err(e) = self.api.db().complete_job(job.id).await {
                    error!("🕰️ Job #{} finished but could not be marked complete: {e}", job.id);
                } else {
                    info!("🕰️ Job #{} done. Quotation #{} is {} with {} matches", job.id, job.quotation_id,
                        outcome.status, outcome.matches.len());
                }
            },
            Err(e) if e.is_permanent() => {
                warn!("🕰️ Job #{} failed permanently: {e}", job.id);
                if let Err(e2) = self.api.db().fail_job(job.id, &e.to_string()).await {
                    error!("🕰️ Could not park job #{} as failed: {e2}", job.id);
                }
            },
            Err(e) => {
                warn!("🕰️ Job #{} failed: {e}", job.id);
                // The business outcome is recorded now; a later queue retry may still succeed and overwrite it
                // with a happier one.
                if let Err(e2) =
                    self.api.db().mark_quotation_outcome(job.quotation_id, QuotationStatus::Failed).await
                {
                    error!("🕰️ Could not record the failure on quotation #{}: {e2}", job.quotation_id);
                }
                match self.api.db().retry_or_fail_job(job, &e.to_string(), self.retry_backoff).await {
                    Ok(updated) if updated.attempts_exhausted() => {
                        error!("🕰️ Job #{} is out of attempts and has been parked as failed", job.id)
                    },
                    Ok(updated) => {
                        info!("🕰️ Job #{} re-queued, due again at {}", job.id, updated.next_attempt_at)
                    },
                    Err(e2) => error!("🕰️ Could not re-queue job #{}: {e2}", job.id),
                }
            },
        }
    }
}

/// The startup sweep: returns crashed `active` jobs to the queue and re-enqueues quotations that were caught
/// mid-processing with no surviving job.
pub async fn recover_interrupted_work<B>(db: &B, max_attempts: i64)
where B: MatchingDatabase + JobQueue {
    match db.reactivate_stale_jobs().await {
        Ok(0) => {},
        Ok(n) => info!("🕰️ Returned {n} interrupted jobs to the queue"),
        Err(e) => error!("🕰️ Could not reactivate interrupted jobs: {e}"),
    }
    let stuck = match db.stuck_quotations().await {
        Ok(ids) => ids,
        Err(e) => {
            error!("🕰️ Could not scan for stuck quotations: {e}");
            return;
        },
    };
    for quotation_id in stuck {
        match db.enqueue(quotation_id, JobOrigin::Recovery, max_attempts).await {
            Ok(job) => info!("🕰️ Quotation #{quotation_id} was stuck in processing. Re-queued as job #{}", job.id),
            Err(e) => error!("🕰️ Could not re-queue stuck quotation #{quotation_id}: {e}"),
        }
    }
}
