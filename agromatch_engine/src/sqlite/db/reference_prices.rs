use sqlx::SqliteConnection;

use crate::{db_types::ReferencePrice, sqlite::SqliteDatabaseError};

/// The most recently stored reference-market price for a product, if any.
pub async fn latest_for_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ReferencePrice>, SqliteDatabaseError> {
    let price = sqlx::query_as::<_, ReferencePrice>(
        r#"
            SELECT id, product_id, price_per_ton, created_at
            FROM reference_prices
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1;
        "#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(price)
}
