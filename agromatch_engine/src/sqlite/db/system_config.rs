use sqlx::SqliteConnection;

use crate::sqlite::SqliteDatabaseError;

/// Reads the configured USD → local rate from the single system-config row, if present.
pub async fn fetch_usd_rate(conn: &mut SqliteConnection) -> Result<Option<f64>, SqliteDatabaseError> {
    let rate = sqlx::query_scalar::<_, Option<f64>>("SELECT usd_rate FROM system_config WHERE id = 1")
        .fetch_optional(conn)
        .await?;
    Ok(rate.flatten())
}
