//! Candidate scoring.
//!
//! Each candidate is priced end to end: route, transport cost, currency normalization, commission and finally a
//! profitability score. Candidates are processed in fixed-size concurrent batches; a candidate that cannot be
//! priced is dropped with a log line and never takes its batch down with it.
use futures_util::future::join_all;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OpportunityContext, QuotationContext},
    helpers::meters_to_km,
    matching::{
        routing::{RouteLeg, RouteResolver, RoutingProvider},
        transport::TransportRateResolver,
        MatchingConfig,
    },
    traits::{RateStore, RouteStore},
};

/// A fully priced candidate, ready for ranking and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub candidate: OpportunityContext,
    pub route: RouteLeg,
    pub distance_km: f64,
    /// Profitability plus the promoted bonus, when applicable.
    pub score: f64,
    /// Normalized price per ton, minus transport per ton, minus commission per ton.
    pub profitability: f64,
    /// Price per ton in the local currency (USD prices are multiplied by the run's exchange rate).
    pub price_per_ton: f64,
    pub transport_rate_per_ton: f64,
    pub transport_cost_total: f64,
    pub commission_total: f64,
    pub payment_option_id: i64,
    /// The exchange rate applied to normalize the price. `None` for local-currency candidates.
    pub exchange_rate_used: Option<f64>,
    pub is_promoted: bool,
}

impl ScoredMatch {
    pub fn is_benchmark(&self) -> bool {
        self.candidate.is_benchmark()
    }
}

pub struct MatchScorer<S, P, R>
where S: RouteStore, P: RoutingProvider, R: RateStore
{
    routes: RouteResolver<S, P>,
    rates: TransportRateResolver<R>,
    config: MatchingConfig,
}

impl<S, P, R> MatchScorer<S, P, R>
where S: RouteStore, P: RoutingProvider, R: RateStore
{
    pub fn new(routes: RouteResolver<S, P>, rates: TransportRateResolver<R>, config: MatchingConfig) -> Self {
        Self { routes, rates, config }
    }

    /// Prices every candidate against the quotation and returns the survivors, sorted by descending score.
    /// The sort is stable, so candidates with equal scores keep the catalogue order (promoted first, then
    /// newest first).
    pub async fn score_all(
        &self,
        ctx: &QuotationContext,
        candidates: &[OpportunityContext],
        exchange_rate: f64,
    ) -> Vec<ScoredMatch> {
        let mut scored = Vec::with_capacity(candidates.len());
        for batch in candidates.chunks(self.config.batch_size.max(1)) {
            let futures = batch.iter().map(|c| self.score_candidate(ctx, c, exchange_rate));
            let results = join_all(futures).await;
            scored.extend(results.into_iter().flatten());
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    /// Prices one candidate. Returns `None` when the candidate cannot be priced; the reason is logged.
    async fn score_candidate(
        &self,
        ctx: &QuotationContext,
        candidate: &OpportunityContext,
        exchange_rate: f64,
    ) -> Option<ScoredMatch> {
        let quantity = ctx.quantity_tons();
        if quantity <= 0.0 {
            debug!("🔄️ Quotation #{} has a non-positive quantity ({quantity} t). Nothing to score", ctx.id());
            return None;
        }
        let route = self.routes.resolve(&ctx.location, &candidate.location).await;
        let distance_km = meters_to_km(route.distance_meters);
        let transport_rate = match self.rates.rate_for_distance(distance_km).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!("🔄️ Could not price transport for opportunity #{} ({e}). Skipping it", candidate.id());
                return None;
            },
        };
        let Some(option) = candidate.payment_options.iter().find(|po| po.price_per_ton.is_some()) else {
            debug!("🔄️ Opportunity #{} has no priced payment option. Skipping it", candidate.id());
            return None;
        };
        let raw_price = option.price_per_ton.map(|p| p.to_f64()).unwrap_or_default();
        let currency = candidate.opportunity.currency;
        let (price_per_ton, exchange_rate_used) = if currency.is_foreign() {
            (raw_price * exchange_rate, Some(exchange_rate))
        } else {
            (raw_price, None)
        };
        let commission_per_ton = price_per_ton * self.config.commission_rate;
        let profitability = price_per_ton - transport_rate - commission_per_ton;
        let is_promoted = candidate.opportunity.is_promoted;
        let score = if is_promoted { profitability + self.config.promoted_bonus } else { profitability };
        trace!(
            "🔄️ Opportunity #{}: {distance_km:.1} km, price {price_per_ton:.2}/t, transport {transport_rate:.2}/t, \
             score {score:.2}",
            candidate.id()
        );
        Some(ScoredMatch {
            candidate: candidate.clone(),
            route,
            distance_km,
            score,
            profitability,
            price_per_ton,
            transport_rate_per_ton: transport_rate,
            transport_cost_total: transport_rate * quantity,
            commission_total: commission_per_ton * quantity,
            payment_option_id: option.id,
            exchange_rate_used,
            is_promoted,
        })
    }
}
