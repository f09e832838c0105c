use thiserror::Error;

use crate::{db_types::Route, matching::RouteLeg};

#[derive(Debug, Clone, Error)]
pub enum RouteStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for RouteStoreError {
    fn from(e: sqlx::Error) -> Self {
        RouteStoreError::DatabaseError(e.to_string())
    }
}

/// The persisted route cache. Keys are directional (origin id, destination id) pairs; concurrent writers race
/// harmlessly to the same final row via upsert semantics.
#[allow(async_fn_in_trait)]
pub trait RouteStore {
    /// Fetches the cached route for the exact directional pair, if one exists.
    async fn fetch_route(&self, origin_id: i64, destination_id: i64) -> Result<Option<Route>, RouteStoreError>;

    /// Inserts or replaces the cached route for the directional pair and marks it valid.
    async fn upsert_route(&self, origin_id: i64, destination_id: i64, leg: &RouteLeg) -> Result<(), RouteStoreError>;
}
