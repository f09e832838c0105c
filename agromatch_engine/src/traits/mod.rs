//! Interface contracts of the matching engine database *backends*.
//!
//! The match pipeline never talks to a concrete database; it is written against the traits in this module, and a
//! backend (currently SQLite, see [`crate::SqliteDatabase`]) implements them over a connection pool.
//!
//! * [`MatchingDatabase`] covers the quotation lifecycle: loading quotations and candidate opportunities, status
//!   transitions, reference prices and idempotent match persistence.
//! * [`RouteStore`] is the persisted route cache consulted and written by the route resolver.
//! * [`RateStore`] serves the transport rate tables and the system-wide USD rate.
//! * [`JobQueue`] is the durable, at-least-once job queue that drives processing.
mod job_queue;
mod matching_database;
mod rate_store;
mod route_store;

pub use job_queue::{JobQueue, JobQueueError};
pub use matching_database::{MatchingDatabase, MatchingDbError};
pub use rate_store::{RateStore, RateStoreError, TransportPriceRange, TransportRateTier};
pub use route_store::{RouteStore, RouteStoreError};
