//! Per-ton transport rate resolution.
//!
//! Resolution order for a given distance:
//! 1. a custom price range covering the distance exactly,
//! 2. the custom range reaching furthest below the distance,
//! 3. the highest rate-table tier at or below the distance,
//! 4. the lowest tier,
//! 5. a linear `distance × 10` estimate.
//!
//! The configured discount applies to table-derived and linear rates but never to custom ranges, which are
//! negotiated prices.
use log::*;
use thiserror::Error;

use crate::traits::{RateStore, RateStoreError};

/// Rate used when no tables are loaded at all, per ton per km.
pub const LINEAR_FALLBACK_RATE_PER_KM: f64 = 10.0;

#[derive(Debug, Clone, Error)]
pub enum RateResolutionError {
    #[error("Transport rate lookup failed: {0}")]
    StoreError(#[from] RateStoreError),
}

pub struct TransportRateResolver<S>
where S: RateStore
{
    store: S,
    table_rate_discount: f64,
}

impl<S> TransportRateResolver<S>
where S: RateStore
{
    /// `table_rate_discount` is a fraction in `[0, 1)`: 0.15 knocks 15% off table-derived rates.
    pub fn new(store: S, table_rate_discount: f64) -> Self {
        let table_rate_discount = if (0.0..1.0).contains(&table_rate_discount) {
            table_rate_discount
        } else {
            warn!("🚚️ Ignoring out-of-range transport discount {table_rate_discount}");
            0.0
        };
        Self { store, table_rate_discount }
    }

    /// The per-ton rate for hauling one ton over `distance_km`. Partial kilometers count as whole ones.
    pub async fn rate_for_distance(&self, distance_km: f64) -> Result<f64, RateResolutionError> {
        let km = distance_km.ceil().max(0.0) as i64;
        if let Some(range) = self.store.price_range_for_distance(km).await? {
            trace!("🚚️ {km} km priced from custom range #{}", range.id);
            return Ok(range.rate_per_ton);
        }
        if let Some(range) = self.store.widest_price_range_below(km).await? {
            trace!("🚚️ {km} km beyond all ranges; priced from range #{}", range.id);
            return Ok(range.rate_per_ton);
        }
        if let Some(tier) = self.store.tier_for_distance(km).await? {
            trace!("🚚️ {km} km priced from rate-table tier #{}", tier.id);
            return Ok(self.discounted(tier.rate_per_ton));
        }
        if let Some(tier) = self.store.lowest_tier().await? {
            trace!("🚚️ {km} km is below the rate table; priced from the lowest tier #{}", tier.id);
            return Ok(self.discounted(tier.rate_per_ton));
        }
        debug!("🚚️ No transport tables are loaded. Estimating {km} km linearly");
        Ok(self.discounted(km as f64 * LINEAR_FALLBACK_RATE_PER_KM))
    }

    fn discounted(&self, rate: f64) -> f64 {
        let discounted = rate * (1.0 - self.table_rate_discount);
        (discounted * 100.0).round() / 100.0
    }
}
