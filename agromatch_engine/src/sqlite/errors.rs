use thiserror::Error;

use crate::traits::{JobQueueError, MatchingDbError, RateStoreError, RouteStoreError};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<SqliteDatabaseError> for MatchingDbError {
    fn from(e: SqliteDatabaseError) -> Self {
        MatchingDbError::DatabaseError(e.to_string())
    }
}

impl From<SqliteDatabaseError> for RouteStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        RouteStoreError::DatabaseError(e.to_string())
    }
}

impl From<SqliteDatabaseError> for RateStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        RateStoreError::DatabaseError(e.to_string())
    }
}

impl From<SqliteDatabaseError> for JobQueueError {
    fn from(e: SqliteDatabaseError) -> Self {
        JobQueueError::DatabaseError(e.to_string())
    }
}
