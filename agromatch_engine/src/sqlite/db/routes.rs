use sqlx::SqliteConnection;

use crate::{db_types::Route, matching::RouteLeg, sqlite::SqliteDatabaseError};

pub async fn fetch_route(
    origin_id: i64,
    destination_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Route>, SqliteDatabaseError> {
    let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE origin_id = $1 AND destination_id = $2")
        .bind(origin_id)
        .bind(destination_id)
        .fetch_optional(conn)
        .await?;
    Ok(route)
}

pub async fn upsert_route(
    origin_id: i64,
    destination_id: i64,
    leg: &RouteLeg,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO routes (origin_id, destination_id, distance_meters, duration_seconds, geometry, is_valid)
            VALUES ($1, $2, $3, $4, $5, 1)
            ON CONFLICT (origin_id, destination_id) DO UPDATE SET
                distance_meters = excluded.distance_meters,
                duration_seconds = excluded.duration_seconds,
                geometry = excluded.geometry,
                is_valid = 1,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(origin_id)
    .bind(destination_id)
    .bind(leg.distance_meters)
    .bind(leg.duration_seconds)
    .bind(leg.geometry.as_deref())
    .execute(conn)
    .await?;
    Ok(())
}
