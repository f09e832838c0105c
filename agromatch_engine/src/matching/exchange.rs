//! The cached USD → local exchange rate.
//!
//! The rate lives in the single system-config row and changes rarely, so a short in-process cache keeps the
//! scorer from hammering the store. The provider is infallible: a store outage degrades to the stale cached
//! value, or the documented default when nothing was ever cached.
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::traits::RateStore;

/// The rate assumed when no system config exists and nothing has been cached.
pub const DEFAULT_USD_RATE: f64 = 1000.0;
/// How long a fetched rate stays fresh.
pub const EXCHANGE_RATE_TTL_SECONDS: i64 = 300;

/// An injectable time source, so the cache TTL can be tested without sleeping.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    value: f64,
    fetched_at: DateTime<Utc>,
}

pub struct ExchangeRateProvider<S, K>
where S: RateStore, K: Clock
{
    store: S,
    clock: K,
    ttl: Duration,
    cache: Mutex<Option<CachedRate>>,
}

impl<S> ExchangeRateProvider<S, SystemClock>
where S: RateStore
{
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S, K> ExchangeRateProvider<S, K>
where S: RateStore, K: Clock
{
    pub fn with_clock(store: S, clock: K) -> Self {
        Self { store, clock, ttl: Duration::seconds(EXCHANGE_RATE_TTL_SECONDS), cache: Mutex::new(None) }
    }

    /// The current USD → local rate. Serves the cached value while fresh; on a store outage, the stale value
    /// (warn-logged) or [`DEFAULT_USD_RATE`].
    pub async fn get_rate(&self) -> f64 {
        let now = self.clock.now();
        let cached = *self.cache.lock().unwrap();
        if let Some(c) = cached {
            if now - c.fetched_at < self.ttl {
                return c.value;
            }
        }
        match self.store.fetch_usd_rate().await {
            Ok(rate) => {
                let value = rate.unwrap_or_else(|| {
                    debug!("💱️ No USD rate configured. Using the default of {DEFAULT_USD_RATE}");
                    DEFAULT_USD_RATE
                });
                *self.cache.lock().unwrap() = Some(CachedRate { value, fetched_at: now });
                value
            },
            Err(e) => match cached {
                Some(c) => {
                    warn!("💱️ Could not refresh the USD rate ({e}). Serving the stale value {}", c.value);
                    c.value
                },
                None => {
                    warn!("💱️ Could not fetch the USD rate ({e}) and nothing is cached. Using {DEFAULT_USD_RATE}");
                    DEFAULT_USD_RATE
                },
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::traits::{RateStoreError, TransportPriceRange, TransportRateTier};

    #[derive(Clone)]
    struct FakeRateStore {
        rate: Option<f64>,
        fail: bool,
        fetches: Arc<AtomicUsize>,
    }

    impl FakeRateStore {
        fn with_rate(rate: f64) -> Self {
            Self { rate: Some(rate), fail: false, fetches: Arc::new(AtomicUsize::new(0)) }
        }

        fn empty() -> Self {
            Self { rate: None, fail: false, fetches: Arc::new(AtomicUsize::new(0)) }
        }

        fn failing() -> Self {
            Self { rate: None, fail: true, fetches: Arc::new(AtomicUsize::new(0)) }
        }
    }

    impl RateStore for FakeRateStore {
        async fn price_range_for_distance(&self, _: i64) -> Result<Option<TransportPriceRange>, RateStoreError> {
            Ok(None)
        }

        async fn widest_price_range_below(&self, _: i64) -> Result<Option<TransportPriceRange>, RateStoreError> {
            Ok(None)
        }

        async fn tier_for_distance(&self, _: i64) -> Result<Option<TransportRateTier>, RateStoreError> {
            Ok(None)
        }

        async fn lowest_tier(&self) -> Result<Option<TransportRateTier>, RateStoreError> {
            Ok(None)
        }

        async fn fetch_usd_rate(&self) -> Result<Option<f64>, RateStoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RateStoreError::DatabaseError("offline".to_string()));
            }
            Ok(self.rate)
        }
    }

    #[derive(Clone)]
    struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self { now: Arc::new(Mutex::new(Utc::now())) }
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn rate_is_cached_for_the_ttl() {
        let store = FakeRateStore::with_rate(1234.5);
        let clock = ManualClock::new();
        let provider = ExchangeRateProvider::with_clock(store.clone(), clock.clone());
        assert_eq!(provider.get_rate().await, 1234.5);
        assert_eq!(provider.get_rate().await, 1234.5);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        clock.advance(EXCHANGE_RATE_TTL_SECONDS + 1);
        assert_eq!(provider.get_rate().await, 1234.5);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_config_yields_the_default() {
        let provider = ExchangeRateProvider::new(FakeRateStore::empty());
        assert_eq!(provider.get_rate().await, DEFAULT_USD_RATE);
    }

    #[tokio::test]
    async fn store_outage_without_cache_yields_the_default() {
        let provider = ExchangeRateProvider::new(FakeRateStore::failing());
        assert_eq!(provider.get_rate().await, DEFAULT_USD_RATE);
    }

    #[tokio::test]
    async fn store_outage_serves_the_stale_value() {
        let clock = ManualClock::new();
        let provider = ExchangeRateProvider::with_clock(FakeRateStore::failing(), clock.clone());
        *provider.cache.lock().unwrap() = Some(CachedRate { value: 980.0, fetched_at: clock.now() });
        clock.advance(EXCHANGE_RATE_TTL_SECONDS + 1);
        assert_eq!(provider.get_rate().await, 980.0);
    }
}
