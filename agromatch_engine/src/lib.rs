//! # AgroMatch engine
//!
//! The quotation-matching engine: everything between "a seller posted a quotation" and "ranked, persisted
//! matches are ready to notify".
//!
//! ## Architecture
//!
//! The pipeline is written against the backend traits in [`traits`] ([`traits::MatchingDatabase`],
//! [`traits::RouteStore`], [`traits::RateStore`], [`traits::JobQueue`]); the [`sqlite`] module provides the
//! production implementation of all four over a single connection pool.
//!
//! [`matching`] holds the pipeline itself: route resolution with a persisted cache and a straight-line
//! fallback, transport rate tables, the cached USD exchange rate, the synthetic reference-market benchmark,
//! batched candidate scoring, and idempotent match persistence, orchestrated by
//! [`matching::MatchFlowApi::process_quotation`].
//!
//! [`events`] is a small stateless pub-sub layer; the flow publishes a [`events::MatchesReadyEvent`] whenever a
//! quotation closes with at least one match, and subscribers (notification dispatchers) react without touching
//! engine state.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod matching;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
