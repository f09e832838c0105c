use sqlx::SqliteConnection;

use crate::{
    sqlite::SqliteDatabaseError,
    traits::{TransportPriceRange, TransportRateTier},
};

pub async fn price_range_for_distance(
    km: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<TransportPriceRange>, SqliteDatabaseError> {
    let range = sqlx::query_as::<_, TransportPriceRange>(
        r#"
            SELECT id, min_distance, max_distance, rate_per_ton
            FROM transport_price_ranges
            WHERE min_distance <= $1 AND max_distance >= $1
            ORDER BY min_distance
            LIMIT 1;
        "#,
    )
    .bind(km)
    .fetch_optional(conn)
    .await?;
    Ok(range)
}

pub async fn widest_price_range_below(
    km: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<TransportPriceRange>, SqliteDatabaseError> {
    let range = sqlx::query_as::<_, TransportPriceRange>(
        r#"
            SELECT id, min_distance, max_distance, rate_per_ton
            FROM transport_price_ranges
            WHERE min_distance <= $1
            ORDER BY max_distance DESC
            LIMIT 1;
        "#,
    )
    .bind(km)
    .fetch_optional(conn)
    .await?;
    Ok(range)
}

pub async fn tier_for_distance(
    km: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<TransportRateTier>, SqliteDatabaseError> {
    let tier = sqlx::query_as::<_, TransportRateTier>(
        r#"
            SELECT id, kilometers, rate_per_ton
            FROM transport_rates
            WHERE kilometers <= $1
            ORDER BY kilometers DESC
            LIMIT 1;
        "#,
    )
    .bind(km)
    .fetch_optional(conn)
    .await?;
    Ok(tier)
}

pub async fn lowest_tier(conn: &mut SqliteConnection) -> Result<Option<TransportRateTier>, SqliteDatabaseError> {
    let tier = sqlx::query_as::<_, TransportRateTier>(
        "SELECT id, kilometers, rate_per_ton FROM transport_rates ORDER BY kilometers ASC LIMIT 1",
    )
    .fetch_optional(conn)
    .await?;
    Ok(tier)
}
