//! `SqliteDatabase` is a concrete implementation of a matching engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module over a single connection pool.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use super::{
    db::{db_url, jobs, matches, new_pool, opportunities, quotations, reference_prices, routes, system_config,
        transport_rates},
    errors::SqliteDatabaseError,
};
use crate::{
    db_types::{JobOrigin, Match, MatchJob, NewMatch, OpportunityContext, QuotationContext, QuotationStatus,
        ReferencePrice, Route},
    db_types::{ProcessingStatus, QuotationStatus::Processing},
    matching::RouteLeg,
    traits::{
        JobQueue,
        JobQueueError,
        MatchingDatabase,
        MatchingDbError,
        RateStore,
        RateStoreError,
        RouteStore,
        RouteStoreError,
        TransportPriceRange,
        TransportRateTier,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the url from the environment (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Wraps an existing pool (used by tests, which run on in-memory databases).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { url: "sqlite::memory:".to_string(), pool }
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl MatchingDatabase for SqliteDatabase {
    async fn fetch_quotation_context(&self, quotation_id: i64) -> Result<Option<QuotationContext>, MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let ctx = quotations::fetch_quotation_context(quotation_id, &mut conn).await?;
        Ok(ctx)
    }

    async fn fetch_candidate_opportunities(
        &self,
        product_id: i64,
    ) -> Result<Vec<OpportunityContext>, MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let candidates = opportunities::fetch_candidates(product_id, &mut conn).await?;
        Ok(candidates)
    }

    async fn latest_reference_price(&self, product_id: i64) -> Result<Option<ReferencePrice>, MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let price = reference_prices::latest_for_product(product_id, &mut conn).await?;
        Ok(price)
    }

    async fn mark_quotation_processing(&self, quotation_id: i64) -> Result<(), MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        quotations::set_statuses(quotation_id, Processing, ProcessingStatus::Processing, &mut conn).await?;
        debug!("🗃️ Quotation #{quotation_id} flagged as processing");
        Ok(())
    }

    async fn mark_quotation_outcome(
        &self,
        quotation_id: i64,
        status: QuotationStatus,
    ) -> Result<(), MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        quotations::set_statuses(quotation_id, status, ProcessingStatus::Completed, &mut conn).await?;
        debug!("🗃️ Quotation #{quotation_id} closed with outcome {status}");
        Ok(())
    }

    async fn insert_match(&self, m: &NewMatch) -> Result<Option<i64>, MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let id = matches::insert_match(m, &mut conn).await?;
        Ok(id)
    }

    async fn fetch_matches_for_quotation(&self, quotation_id: i64) -> Result<Vec<Match>, MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let matches = matches::fetch_for_quotation(quotation_id, &mut conn).await?;
        Ok(matches)
    }

    async fn stuck_quotations(&self) -> Result<Vec<i64>, MatchingDbError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let ids = quotations::stuck_quotation_ids(&mut conn).await?;
        Ok(ids)
    }
}

impl RouteStore for SqliteDatabase {
    async fn fetch_route(&self, origin_id: i64, destination_id: i64) -> Result<Option<Route>, RouteStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let route = routes::fetch_route(origin_id, destination_id, &mut conn).await?;
        Ok(route)
    }

    async fn upsert_route(
        &self,
        origin_id: i64,
        destination_id: i64,
        leg: &RouteLeg,
    ) -> Result<(), RouteStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        routes::upsert_route(origin_id, destination_id, leg, &mut conn).await?;
        trace!("🗃️ Route {origin_id} → {destination_id} cached ({} m)", leg.distance_meters);
        Ok(())
    }
}

impl RateStore for SqliteDatabase {
    async fn price_range_for_distance(&self, km: i64) -> Result<Option<TransportPriceRange>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let range = transport_rates::price_range_for_distance(km, &mut conn).await?;
        Ok(range)
    }

    async fn widest_price_range_below(&self, km: i64) -> Result<Option<TransportPriceRange>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let range = transport_rates::widest_price_range_below(km, &mut conn).await?;
        Ok(range)
    }

    async fn tier_for_distance(&self, km: i64) -> Result<Option<TransportRateTier>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let tier = transport_rates::tier_for_distance(km, &mut conn).await?;
        Ok(tier)
    }

    async fn lowest_tier(&self) -> Result<Option<TransportRateTier>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let tier = transport_rates::lowest_tier(&mut conn).await?;
        Ok(tier)
    }

    async fn fetch_usd_rate(&self) -> Result<Option<f64>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let rate = system_config::fetch_usd_rate(&mut conn).await?;
        Ok(rate)
    }
}

impl JobQueue for SqliteDatabase {
    async fn enqueue(
        &self,
        quotation_id: i64,
        origin: JobOrigin,
        max_attempts: i64,
    ) -> Result<MatchJob, JobQueueError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let job = jobs::enqueue(quotation_id, origin, max_attempts, &mut conn).await?;
        Ok(job)
    }

    async fn claim_due_job(&self) -> Result<Option<MatchJob>, JobQueueError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let job = jobs::claim_due(&mut conn).await?;
        Ok(job)
    }

    async fn complete_job(&self, job_id: i64) -> Result<(), JobQueueError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        jobs::complete(job_id, &mut conn).await?;
        Ok(())
    }

    async fn fail_job(&self, job_id: i64, error: &str) -> Result<(), JobQueueError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        jobs::fail(job_id, error, &mut conn).await?;
        Ok(())
    }

    async fn retry_or_fail_job(
        &self,
        job: &MatchJob,
        error: &str,
        backoff_base: Duration,
    ) -> Result<MatchJob, JobQueueError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let job = jobs::retry_or_fail(job, error, backoff_base, &mut conn).await?;
        Ok(job)
    }

    async fn reactivate_stale_jobs(&self) -> Result<u64, JobQueueError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let count = jobs::reactivate_stale(&mut conn).await?;
        if count > 0 {
            info!("🗃️ {count} stale active jobs returned to the queue");
        }
        Ok(count)
    }
}
