//! # SQLite database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an atomic transaction
//! as the need arises and call through to the functions without any other changes.
//!
//! Timestamps are written by SQLite itself (`CURRENT_TIMESTAMP`, with `datetime(...)` arithmetic for the queue's
//! backoff), so every stored value shares one format and due-time comparisons stay consistent.
use std::env;

use log::info;
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod jobs;
pub mod matches;
pub mod opportunities;
pub mod quotations;
pub mod reference_prices;
pub mod routes;
pub mod system_config;
pub mod transport_rates;

const SQLITE_DB_URL: &str = "sqlite://data/agromatch.db";

pub fn db_url() -> String {
    let result = env::var("AGM_DATABASE_URL").unwrap_or_else(|_| {
        info!("AGM_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Applies the engine's schema migrations to the given pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
