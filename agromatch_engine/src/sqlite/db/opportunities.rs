use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Opportunity, OpportunityContext, PaymentOption, Product},
    sqlite::{db::quotations::fetch_location, SqliteDatabaseError},
};

/// Lists the active, unexpired opportunities for a product, promoted first, then newest first, each with its
/// product, location and payment options loaded.
pub async fn fetch_candidates(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OpportunityContext>, SqliteDatabaseError> {
    let opportunities = sqlx::query_as::<_, Opportunity>(
        r#"
            SELECT * FROM opportunities
            WHERE product_id = $1
              AND status = 'active'
              AND (expires_at IS NULL OR expires_at > CURRENT_TIMESTAMP)
            ORDER BY is_promoted DESC, created_at DESC;
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;
    if opportunities.is_empty() {
        return Ok(Vec::new());
    }
    let product = sqlx::query_as::<_, Product>("SELECT id, name, category FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;
    let mut result = Vec::with_capacity(opportunities.len());
    for opportunity in opportunities {
        let location = fetch_location(opportunity.location_id, &mut *conn).await?;
        let payment_options = payment_options_for(opportunity.id, &mut *conn).await?;
        result.push(OpportunityContext { opportunity, product: product.clone(), location, payment_options });
    }
    trace!("🗃️ {} candidate opportunities fetched for product #{product_id}", result.len());
    Ok(result)
}

pub async fn payment_options_for(
    opportunity_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentOption>, SqliteDatabaseError> {
    let options = sqlx::query_as::<_, PaymentOption>(
        r#"
            SELECT
                id,
                opportunity_id,
                price_per_ton,
                payment_term_days,
                is_reference_based,
                reference_diff,
                reference_diff_type,
                reference_diff_currency
            FROM payment_options
            WHERE opportunity_id = $1
            ORDER BY id;
        "#,
    )
    .bind(opportunity_id)
    .fetch_all(conn)
    .await?;
    Ok(options)
}
