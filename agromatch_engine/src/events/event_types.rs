use serde::{Deserialize, Serialize};

use crate::{db_types::QuotationContext, matching::ScoredMatch};

/// Published when a quotation finishes processing with at least one persisted match. Carries everything a
/// notification dispatcher needs; it is never published with an empty match list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesReadyEvent {
    pub quotation: QuotationContext,
    /// The persisted matches, best score first.
    pub matches: Vec<ScoredMatch>,
}

impl MatchesReadyEvent {
    pub fn new(quotation: QuotationContext, matches: Vec<ScoredMatch>) -> Self {
        Self { quotation, matches }
    }
}
