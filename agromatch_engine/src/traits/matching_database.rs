use thiserror::Error;

use crate::db_types::{Match, NewMatch, OpportunityContext, QuotationContext, QuotationStatus, ReferencePrice};

#[derive(Debug, Clone, Error)]
pub enum MatchingDbError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for MatchingDbError {
    fn from(e: sqlx::Error) -> Self {
        MatchingDbError::DatabaseError(e.to_string())
    }
}

/// The quotation-side contract of the matching engine.
///
/// Backends own the quotation lifecycle (the engine is the only writer of quotation statuses), expose the
/// read-only opportunity catalogue, and persist computed matches idempotently per (quotation, opportunity) pair.
#[allow(async_fn_in_trait)]
pub trait MatchingDatabase {
    /// Fetches the quotation with its product and origin location. Returns `None` if the quotation does not exist.
    async fn fetch_quotation_context(&self, quotation_id: i64) -> Result<Option<QuotationContext>, MatchingDbError>;

    /// Lists the active, unexpired opportunities for the given product, each with its product, location and
    /// payment options. Promoted opportunities come first, then newest first.
    async fn fetch_candidate_opportunities(&self, product_id: i64)
        -> Result<Vec<OpportunityContext>, MatchingDbError>;

    /// The most recent reference-market price for a product, if any has ever been stored.
    async fn latest_reference_price(&self, product_id: i64) -> Result<Option<ReferencePrice>, MatchingDbError>;

    /// Flags the quotation as being worked on: business status and processing status both become `processing`.
    async fn mark_quotation_processing(&self, quotation_id: i64) -> Result<(), MatchingDbError>;

    /// Records the business outcome and closes the processing status (always `completed`), so the quotation is
    /// never automatically re-enqueued regardless of outcome.
    async fn mark_quotation_outcome(
        &self,
        quotation_id: i64,
        status: QuotationStatus,
    ) -> Result<(), MatchingDbError>;

    /// Inserts one match row. Returns `None` when a row for the same (quotation, opportunity) pair already
    /// exists, which makes job retries idempotent.
    async fn insert_match(&self, m: &NewMatch) -> Result<Option<i64>, MatchingDbError>;

    /// All persisted matches for a quotation, newest attempt first.
    async fn fetch_matches_for_quotation(&self, quotation_id: i64) -> Result<Vec<Match>, MatchingDbError>;

    /// Ids of quotations left in a `processing` processing-status by a prior crash. Used by the startup sweep.
    async fn stuck_quotations(&self) -> Result<Vec<i64>, MatchingDbError>;
}
