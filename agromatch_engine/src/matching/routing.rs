//! Route resolution with a persisted cache and a straight-line fallback.
//!
//! The resolver tries, in order: the route cache, the external directions provider (persisting the answer for
//! next time), and finally a haversine estimate. The estimate is deliberately never written to the cache, so a
//! later run with a healthy provider can still store the real road distance.
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::Location,
    helpers::haversine_meters,
    traits::RouteStore,
};

/// Assumed truck speed for estimated durations, in meters per second (≈50 km/h).
pub const AVERAGE_SPEED_MPS: f64 = 13.89;

/// A resolved leg between two locations. `geometry` is the provider's encoded polyline, when one was returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub distance_meters: i64,
    pub duration_seconds: i64,
    pub geometry: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum RoutingProviderError {
    #[error("No routing provider is configured")]
    NotConfigured,
    #[error("Directions request failed: {0}")]
    Request(String),
    #[error("Directions response could not be interpreted: {0}")]
    BadResponse(String),
    #[error("The provider found no route between the given points")]
    NoRoute,
}

/// An external road-routing service. Implementations return the best driving leg between two points.
#[allow(async_fn_in_trait)]
pub trait RoutingProvider {
    async fn driving_route(&self, origin: &Location, destination: &Location)
        -> Result<RouteLeg, RoutingProviderError>;
}

/// The always-unavailable provider. Useful in tests and in deployments that run on estimates alone.
#[derive(Debug, Clone, Default)]
pub struct NoRouting;

impl RoutingProvider for NoRouting {
    async fn driving_route(&self, _: &Location, _: &Location) -> Result<RouteLeg, RoutingProviderError> {
        Err(RoutingProviderError::NotConfigured)
    }
}

pub struct RouteResolver<S, P>
where S: RouteStore, P: RoutingProvider
{
    store: S,
    provider: Option<P>,
}

impl<S, P> RouteResolver<S, P>
where S: RouteStore, P: RoutingProvider
{
    pub fn new(store: S, provider: Option<P>) -> Self {
        Self { store, provider }
    }

    /// Resolves the leg from `origin` to `destination`. Infallible: every failure path degrades to the
    /// straight-line estimate.
    pub async fn resolve(&self, origin: &Location, destination: &Location) -> RouteLeg {
        match self.store.fetch_route(origin.id, destination.id).await {
            Ok(Some(route)) if route.is_valid => {
                trace!("🧭️ Route cache hit for {} → {}", origin.id, destination.id);
                return RouteLeg {
                    distance_meters: route.distance_meters,
                    duration_seconds: route.duration_seconds,
                    geometry: route.geometry,
                };
            },
            Ok(_) => {},
            Err(e) => warn!("🧭️ Route cache lookup failed ({e}). Continuing without the cache."),
        }
        if let Some(provider) = &self.provider {
            match provider.driving_route(origin, destination).await {
                Ok(leg) => {
                    // Synthetic locations live in a reserved negative id namespace and must not pollute the
                    // cache, which is keyed on persisted location ids.
                    if !origin.is_synthetic() && !destination.is_synthetic() {
                        if let Err(e) = self.store.upsert_route(origin.id, destination.id, &leg).await {
                            warn!("🧭️ Could not cache route {} → {}: {e}", origin.id, destination.id);
                        }
                    }
                    return leg;
                },
                Err(RoutingProviderError::NotConfigured) => {},
                Err(e) => {
                    warn!("🧭️ Directions provider failed for {} → {} ({e}). Falling back to an estimate.",
                        origin.id, destination.id)
                },
            }
        }
        estimated_leg(origin, destination)
    }
}

/// The straight-line estimate: haversine distance and a duration at [`AVERAGE_SPEED_MPS`].
pub fn estimated_leg(origin: &Location, destination: &Location) -> RouteLeg {
    let distance = haversine_meters(origin.latitude, origin.longitude, destination.latitude, destination.longitude);
    RouteLeg {
        distance_meters: distance.round() as i64,
        duration_seconds: (distance / AVERAGE_SPEED_MPS).round() as i64,
        geometry: None,
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    };

    use chrono::Utc;

    use super::*;
    use crate::{
        db_types::Route,
        traits::RouteStoreError,
    };

    fn loc(id: i64, lat: f64, lon: f64) -> Location {
        Location {
            id,
            city: format!("city-{id}"),
            state: None,
            country: "AR".to_string(),
            latitude: lat,
            longitude: lon,
            place_id: format!("place-{id}"),
        }
    }

    #[derive(Clone, Default)]
    struct MemRouteStore {
        routes: Arc<Mutex<Vec<Route>>>,
    }

    impl RouteStore for MemRouteStore {
        async fn fetch_route(&self, origin_id: i64, destination_id: i64) -> Result<Option<Route>, RouteStoreError> {
            let routes = self.routes.lock().unwrap();
            Ok(routes.iter().find(|r| r.origin_id == origin_id && r.destination_id == destination_id).cloned())
        }

        async fn upsert_route(&self, origin_id: i64, destination_id: i64, leg: &RouteLeg)
            -> Result<(), RouteStoreError>
        {
            let mut routes = self.routes.lock().unwrap();
            routes.retain(|r| !(r.origin_id == origin_id && r.destination_id == destination_id));
            let next_id = routes.len() as i64 + 1;
            routes.push(Route {
                id: next_id,
                origin_id,
                destination_id,
                distance_meters: leg.distance_meters,
                duration_seconds: leg.duration_seconds,
                geometry: leg.geometry.clone(),
                is_valid: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
            Ok(())
        }
    }

    #[derive(Clone)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        result: Result<RouteLeg, RoutingProviderError>,
    }

    impl CountingProvider {
        fn returning(leg: RouteLeg) -> Self {
            Self { calls: Arc::new(AtomicUsize::new(0)), result: Ok(leg) }
        }

        fn failing() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                result: Err(RoutingProviderError::Request("boom".to_string())),
            }
        }
    }

    impl RoutingProvider for CountingProvider {
        async fn driving_route(&self, _: &Location, _: &Location) -> Result<RouteLeg, RoutingProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn provider_result_is_cached_and_reused() {
        let store = MemRouteStore::default();
        let leg = RouteLeg { distance_meters: 120_000, duration_seconds: 8_640, geometry: Some("abc".to_string()) };
        let provider = CountingProvider::returning(leg.clone());
        let resolver = RouteResolver::new(store.clone(), Some(provider.clone()));
        let (a, b) = (loc(1, -32.9595, -60.6393), loc(2, -34.6037, -58.3816));
        let first = resolver.resolve(&a, &b).await;
        let second = resolver.resolve(&a, &b).await;
        assert_eq!(first, leg);
        assert_eq!(second, leg);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "second call must come from the cache");
    }

    #[tokio::test]
    async fn synthetic_locations_are_never_cached() {
        let store = MemRouteStore::default();
        let leg = RouteLeg { distance_meters: 300_000, duration_seconds: 21_600, geometry: None };
        let provider = CountingProvider::returning(leg);
        let resolver = RouteResolver::new(store.clone(), Some(provider));
        let (a, b) = (loc(1, -32.9595, -60.6393), loc(-1, -34.6037, -58.3816));
        let _ = resolver.resolve(&a, &b).await;
        assert!(store.routes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_estimate() {
        let store = MemRouteStore::default();
        let resolver = RouteResolver::new(store.clone(), Some(CountingProvider::failing()));
        let (a, b) = (loc(1, -32.9595, -60.6393), loc(2, -34.6037, -58.3816));
        let leg = resolver.resolve(&a, &b).await;
        assert!(leg.distance_meters > 270_000 && leg.distance_meters < 290_000);
        assert!(leg.geometry.is_none());
        assert!(store.routes.lock().unwrap().is_empty(), "estimates are never persisted");
    }

    #[tokio::test]
    async fn no_provider_means_estimate() {
        let resolver = RouteResolver::<_, NoRouting>::new(MemRouteStore::default(), None);
        let (a, b) = (loc(1, 0.0, 0.0), loc(2, 0.0, 1.0));
        let leg = resolver.resolve(&a, &b).await;
        // One degree of longitude at the equator is about 111 km.
        assert!(leg.distance_meters > 110_000 && leg.distance_meters < 112_000);
        let expected_duration = (leg.distance_meters as f64 / AVERAGE_SPEED_MPS).round() as i64;
        assert_eq!(leg.duration_seconds, expected_duration);
    }
}
