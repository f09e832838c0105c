//! The synthetic benchmark candidate.
//!
//! Every scoring run includes, alongside the real opportunities, one fabricated "sell at the reference market"
//! candidate built from the latest stored reference price. It is scored like any other candidate but excluded
//! from persistence; its only purpose is the comparison columns on real matches.
use chrono::Utc;
use log::*;

use crate::{
    db_types::{Currency, Location, Opportunity, OpportunityContext, PaymentOption, QuotationContext,
        ReferenceDiffType},
    traits::{MatchingDatabase, MatchingDbError},
};

/// The reserved id of the synthetic reference-market location.
pub const REFERENCE_LOCATION_ID: i64 = -1;
pub const REFERENCE_LOCATION_LAT: f64 = -32.9595;
pub const REFERENCE_LOCATION_LON: f64 = -60.6393;
pub const REFERENCE_PAYMENT_TERM_DAYS: i64 = 3;

/// The fixed reference-market location (Rosario port terminals).
pub fn reference_location() -> Location {
    Location {
        id: REFERENCE_LOCATION_ID,
        city: "Rosario".to_string(),
        state: Some("Santa Fe".to_string()),
        country: "AR".to_string(),
        latitude: REFERENCE_LOCATION_LAT,
        longitude: REFERENCE_LOCATION_LON,
        place_id: "rosario-reference".to_string(),
    }
}

/// Builds the benchmark candidate for a quotation, or `None` when no reference price has ever been stored for
/// the product. Synthetic ids use the reserved negative namespace, one slot per product (`-product_id`), so the
/// candidate is stable across runs and recognisable via [`Opportunity::is_benchmark`].
pub async fn build_benchmark_candidate<B: MatchingDatabase>(
    db: &B,
    ctx: &QuotationContext,
) -> Result<Option<OpportunityContext>, MatchingDbError> {
    let product = &ctx.product;
    let Some(reference) = db.latest_reference_price(product.id).await? else {
        debug!("📊️ No reference price stored for {}. Skipping the benchmark candidate", product.name);
        return Ok(None);
    };
    let synthetic_id = -product.id;
    let now = Utc::now();
    let opportunity = Opportunity {
        id: synthetic_id,
        product_id: product.id,
        location_id: REFERENCE_LOCATION_ID,
        quantity_tons: None,
        name: format!("{} reference market", product.name),
        quality: None,
        market_type: "reference".to_string(),
        currency: Currency::Ars,
        status: "active".to_string(),
        is_promoted: false,
        expires_at: None,
        created_at: now,
        updated_at: now,
    };
    let payment_option = PaymentOption {
        id: synthetic_id,
        opportunity_id: synthetic_id,
        price_per_ton: Some(reference.price_per_ton),
        payment_term_days: REFERENCE_PAYMENT_TERM_DAYS,
        is_reference_based: false,
        reference_diff: None,
        reference_diff_type: ReferenceDiffType::Fixed,
        reference_diff_currency: Currency::Ars,
    };
    Ok(Some(OpportunityContext {
        opportunity,
        product: product.clone(),
        location: reference_location(),
        payment_options: vec![payment_option],
    }))
}
