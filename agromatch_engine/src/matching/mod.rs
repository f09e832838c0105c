//! The match pipeline: routing, transport pricing, currency normalization, scoring and persistence, with
//! [`flow_api::MatchFlowApi`] tying the stages together.
pub mod benchmark;
pub mod exchange;
pub mod flow_api;
pub mod persist;
pub mod routing;
pub mod routing_client;
pub mod scoring;
pub mod transport;

pub use exchange::{Clock, ExchangeRateProvider, SystemClock, DEFAULT_USD_RATE};
pub use flow_api::{MatchFlowApi, MatchFlowError, MatchOutcome};
pub use routing::{NoRouting, RouteLeg, RouteResolver, RoutingProvider, RoutingProviderError};
pub use routing_client::{DirectionsApiConfig, DirectionsClient};
pub use scoring::{MatchScorer, ScoredMatch};
pub use transport::{RateResolutionError, TransportRateResolver};

use log::*;

pub const DEFAULT_COMMISSION_RATE: f64 = 0.01;
pub const DEFAULT_PROMOTED_BONUS: f64 = 1000.0;
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// The bonus is added to scores that end up in a clamped fixed-point column, so it is kept well inside the
/// storable range.
pub const MAX_PROMOTED_BONUS: f64 = 1_000_000.0;

/// Tunables of the scoring run. The defaults are the production values.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Fraction of the normalized price charged as commission.
    pub commission_rate: f64,
    /// Flat score bonus for promoted opportunities.
    pub promoted_bonus: f64,
    /// Number of candidates priced concurrently.
    pub batch_size: usize,
    /// Fractional discount on table-derived transport rates. Custom ranges are never discounted.
    pub table_rate_discount: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            promoted_bonus: DEFAULT_PROMOTED_BONUS,
            batch_size: DEFAULT_BATCH_SIZE,
            table_rate_discount: 0.0,
        }
    }
}

impl MatchingConfig {
    /// Replaces out-of-range values with the defaults so a bad environment cannot produce unstorable scores.
    pub fn validated(mut self) -> Self {
        if !(0.0..1.0).contains(&self.commission_rate) {
            warn!("🔄️ Ignoring out-of-range commission rate {}", self.commission_rate);
            self.commission_rate = DEFAULT_COMMISSION_RATE;
        }
        if !(0.0..=MAX_PROMOTED_BONUS).contains(&self.promoted_bonus) {
            warn!("🔄️ Ignoring out-of-range promoted bonus {}", self.promoted_bonus);
            self.promoted_bonus = DEFAULT_PROMOTED_BONUS;
        }
        if self.batch_size == 0 {
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        self
    }
}
