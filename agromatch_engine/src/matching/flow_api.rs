//! The top-level match flow.
//!
//! `MatchFlowApi` owns one end-to-end operation: take a quotation id, price every candidate opportunity against
//! it, persist the results and record the outcome on the quotation. It is the only writer of quotation
//! statuses.
use log::*;
use thiserror::Error;

use crate::{
    db_types::{QuotationContext, QuotationStatus},
    events::{EventProducers, MatchesReadyEvent},
    matching::{
        benchmark::build_benchmark_candidate,
        exchange::{Clock, ExchangeRateProvider},
        routing::{RouteResolver, RoutingProvider},
        scoring::{MatchScorer, ScoredMatch},
        transport::TransportRateResolver,
        persist::persist_matches,
        MatchingConfig,
    },
    traits::{MatchingDatabase, MatchingDbError, RateStore, RouteStore},
};

#[derive(Debug, Clone, Error)]
pub enum MatchFlowError {
    /// The quotation does not exist. Retrying cannot help, so the worker fails the job permanently.
    #[error("Quotation {0} does not exist")]
    QuotationNotFound(i64),
    #[error(transparent)]
    DatabaseError(#[from] MatchingDbError),
}

impl MatchFlowError {
    /// Permanent errors are not worth a queue retry.
    pub fn is_permanent(&self) -> bool {
        matches!(self, MatchFlowError::QuotationNotFound(_))
    }
}

/// The result of one processing run.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub quotation: QuotationContext,
    /// The real (non-benchmark) matches, best score first.
    pub matches: Vec<ScoredMatch>,
    /// Ids of the match rows inserted by this run. Empty on a retried job whose rows already exist.
    pub inserted_ids: Vec<i64>,
    pub status: QuotationStatus,
}

pub struct MatchFlowApi<B, P, K>
where
    B: MatchingDatabase + RouteStore + RateStore + Clone,
    P: RoutingProvider,
    K: Clock,
{
    db: B,
    scorer: MatchScorer<B, P, B>,
    exchange: ExchangeRateProvider<B, K>,
    producers: EventProducers,
}

impl<B, P, K> MatchFlowApi<B, P, K>
where
    B: MatchingDatabase + RouteStore + RateStore + Clone,
    P: RoutingProvider,
    K: Clock,
{
    pub fn new(db: B, routing_provider: Option<P>, clock: K, config: MatchingConfig, producers: EventProducers)
        -> Self
    {
        let routes = RouteResolver::new(db.clone(), routing_provider);
        let rates = TransportRateResolver::new(db.clone(), config.table_rate_discount);
        let scorer = MatchScorer::new(routes, rates, config);
        let exchange = ExchangeRateProvider::with_clock(db.clone(), clock);
        Self { db, scorer, exchange, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Runs the full pipeline for one quotation. Safe to run again for the same quotation: match insertion is
    /// idempotent and statuses converge to the same outcome.
    pub async fn process_quotation(&self, quotation_id: i64) -> Result<MatchOutcome, MatchFlowError> {
        self.db.mark_quotation_processing(quotation_id).await?;
        let ctx = self
            .db
            .fetch_quotation_context(quotation_id)
            .await?
            .ok_or(MatchFlowError::QuotationNotFound(quotation_id))?;
        info!("🔄️ Processing quotation #{quotation_id} ({} t of {})", ctx.quantity_tons(), ctx.product.name);
        let mut candidates = self.db.fetch_candidate_opportunities(ctx.product.id).await?;
        info!("🔄️ {} candidate opportunities for quotation #{quotation_id}", candidates.len());
        if let Some(benchmark) = build_benchmark_candidate(&self.db, &ctx).await? {
            candidates.push(benchmark);
        }
        let exchange_rate = self.exchange.get_rate().await;
        let scored = self.scorer.score_all(&ctx, &candidates, exchange_rate).await;
        let (benchmarks, matches): (Vec<ScoredMatch>, Vec<ScoredMatch>) =
            scored.into_iter().partition(|m| m.is_benchmark());
        let inserted_ids = persist_matches(&self.db, &ctx, &matches, benchmarks.first()).await;
        let status = if matches.is_empty() { QuotationStatus::NoMatches } else { QuotationStatus::Matched };
        self.db.mark_quotation_outcome(quotation_id, status).await?;
        info!("🔄️ Quotation #{quotation_id} closed as {status} with {} matches", matches.len());
        if !matches.is_empty() {
            let event = MatchesReadyEvent::new(ctx.clone(), matches.clone());
            self.producers.publish_matches_ready(event).await;
        }
        Ok(MatchOutcome { quotation: ctx, matches, inserted_ids, status })
    }
}
