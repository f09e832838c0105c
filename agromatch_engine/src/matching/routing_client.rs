//! A [`RoutingProvider`] over a Mapbox-style directions HTTP API.
use log::*;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    db_types::Location,
    matching::routing::{RouteLeg, RoutingProvider, RoutingProviderError},
};

pub const DEFAULT_DIRECTIONS_BASE_URL: &str = "https://api.mapbox.com";
pub const DEFAULT_DIRECTIONS_PROFILE: &str = "driving";

#[derive(Debug, Clone)]
pub struct DirectionsApiConfig {
    pub base_url: String,
    pub profile: String,
    pub access_token: String,
}

impl DirectionsApiConfig {
    pub fn new(access_token: &str) -> Self {
        Self {
            base_url: DEFAULT_DIRECTIONS_BASE_URL.to_string(),
            profile: DEFAULT_DIRECTIONS_PROFILE.to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Builds a config from the environment. Returns `None` when no access token is set, in which case the
    /// resolver runs on estimates alone.
    pub fn from_env() -> Option<Self> {
        let access_token = std::env::var("AGM_DIRECTIONS_TOKEN").ok()?;
        if access_token.trim().is_empty() {
            return None;
        }
        let mut config = Self::new(&access_token);
        if let Ok(url) = std::env::var("AGM_DIRECTIONS_URL") {
            config.base_url = url;
        }
        if let Ok(profile) = std::env::var("AGM_DIRECTIONS_PROFILE") {
            config.profile = profile;
        }
        Some(config)
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    distance: f64,
    duration: f64,
    geometry: Option<String>,
}

/// The reqwest-backed directions client.
#[derive(Debug, Clone)]
pub struct DirectionsClient {
    config: DirectionsApiConfig,
    client: Client,
}

impl DirectionsClient {
    pub fn new(config: DirectionsApiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, client }
    }

    fn url(&self, origin: &Location, destination: &Location) -> Result<Url, RoutingProviderError> {
        let path = format!(
            "{}/directions/v5/mapbox/{}/{},{};{},{}",
            self.config.base_url,
            self.config.profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        );
        let url = Url::parse_with_params(&path, &[
            ("geometries", "polyline"),
            ("overview", "simplified"),
            ("access_token", self.config.access_token.as_str()),
        ])
        .map_err(|e| RoutingProviderError::Request(format!("invalid directions url: {e}")))?;
        Ok(url)
    }
}

impl RoutingProvider for DirectionsClient {
    async fn driving_route(&self, origin: &Location, destination: &Location)
        -> Result<RouteLeg, RoutingProviderError>
    {
        let url = self.url(origin, destination)?;
        trace!("🧭️ GET {} → {} from the directions API", origin.place_id, destination.place_id);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RoutingProviderError::Request(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("🧭️ Directions API returned {status}: {body}");
            return Err(RoutingProviderError::Request(format!("directions API returned {status}")));
        }
        let payload = response
            .json::<DirectionsResponse>()
            .await
            .map_err(|e| RoutingProviderError::BadResponse(e.to_string()))?;
        let best = payload.routes.into_iter().next().ok_or(RoutingProviderError::NoRoute)?;
        Ok(RouteLeg {
            distance_meters: best.distance.round() as i64,
            duration_seconds: best.duration.round() as i64,
            geometry: best.geometry,
        })
    }
}
