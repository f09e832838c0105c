use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Match, NewMatch},
    sqlite::SqliteDatabaseError,
};

/// Inserts one match row. The UNIQUE (quotation_id, opportunity_id) constraint makes this idempotent: a re-run
/// of the same quotation leaves the existing row untouched and returns `None`.
pub async fn insert_match(m: &NewMatch, conn: &mut SqliteConnection) -> Result<Option<i64>, SqliteDatabaseError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO matches (
                quotation_id,
                opportunity_id,
                payment_option_id,
                score,
                profitability,
                commission,
                transportation_cost,
                price_per_ton,
                total_amount,
                exchange_rate_used,
                distance_km,
                is_promoted,
                transport_rate_applied,
                payment_term_days,
                is_reference_based,
                reference_diff_display,
                benchmark_price_per_ton,
                benchmark_difference,
                benchmark_difference_percent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (quotation_id, opportunity_id) DO NOTHING
            RETURNING id;
        "#,
    )
    .bind(m.quotation_id)
    .bind(m.opportunity_id)
    .bind(m.payment_option_id)
    .bind(m.score)
    .bind(m.profitability)
    .bind(m.commission)
    .bind(m.transportation_cost)
    .bind(m.price_per_ton)
    .bind(m.total_amount)
    .bind(m.exchange_rate_used)
    .bind(m.distance_km)
    .bind(m.is_promoted)
    .bind(m.transport_rate_applied)
    .bind(m.payment_term_days)
    .bind(m.is_reference_based)
    .bind(m.reference_diff_display.as_deref())
    .bind(m.benchmark_price_per_ton)
    .bind(m.benchmark_difference)
    .bind(m.benchmark_difference_percent)
    .fetch_optional(conn)
    .await?;
    if id.is_none() {
        debug!(
            "🗃️ Match for quotation #{} and opportunity #{} already exists. Skipping.",
            m.quotation_id, m.opportunity_id
        );
    }
    Ok(id)
}

pub async fn fetch_for_quotation(
    quotation_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Match>, SqliteDatabaseError> {
    let matches = sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE quotation_id = $1 ORDER BY score DESC")
        .bind(quotation_id)
        .fetch_all(conn)
        .await?;
    Ok(matches)
}
