use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RateStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for RateStoreError {
    fn from(e: sqlx::Error) -> Self {
        RateStoreError::DatabaseError(e.to_string())
    }
}

/// A custom per-ton price for a bounded distance band. Custom ranges take precedence over the tiered table and
/// are never discounted.
#[derive(Debug, Clone, FromRow)]
pub struct TransportPriceRange {
    pub id: i64,
    pub min_distance: i64,
    pub max_distance: i64,
    pub rate_per_ton: f64,
}

/// One tier of the standard transport rate table: the per-ton rate for any distance at or above `kilometers`,
/// up to the next tier.
#[derive(Debug, Clone, FromRow)]
pub struct TransportRateTier {
    pub id: i64,
    pub kilometers: i64,
    pub rate_per_ton: f64,
}

/// Lookup tables consumed by the transport rate resolver, plus the single system-config row holding the
/// USD exchange rate.
#[allow(async_fn_in_trait)]
pub trait RateStore {
    /// The custom range with `min_distance ≤ km ≤ max_distance`, if any.
    async fn price_range_for_distance(&self, km: i64) -> Result<Option<TransportPriceRange>, RateStoreError>;

    /// For distances beyond every bounded range: the range with `min_distance ≤ km`, highest `max_distance` first.
    async fn widest_price_range_below(&self, km: i64) -> Result<Option<TransportPriceRange>, RateStoreError>;

    /// The highest rate-table tier whose threshold is `≤ km`.
    async fn tier_for_distance(&self, km: i64) -> Result<Option<TransportRateTier>, RateStoreError>;

    /// The lowest-threshold tier, used as the last table-derived resort.
    async fn lowest_tier(&self) -> Result<Option<TransportRateTier>, RateStoreError>;

    /// The configured USD → local rate, or `None` when no system config exists.
    async fn fetch_usd_rate(&self) -> Result<Option<f64>, RateStoreError>;
}
