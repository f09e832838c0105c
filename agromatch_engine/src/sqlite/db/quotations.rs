use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Location, Product, ProcessingStatus, Quotation, QuotationContext, QuotationStatus},
    sqlite::SqliteDatabaseError,
};

pub async fn fetch_quotation(id: i64, conn: &mut SqliteConnection) -> Result<Option<Quotation>, SqliteDatabaseError> {
    let quotation = sqlx::query_as::<_, Quotation>("SELECT * FROM quotations WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(quotation)
}

/// Fetches the quotation together with its product and origin location.
pub async fn fetch_quotation_context(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<QuotationContext>, SqliteDatabaseError> {
    let quotation = match fetch_quotation(id, &mut *conn).await? {
        Some(q) => q,
        None => return Ok(None),
    };
    let product = sqlx::query_as::<_, Product>("SELECT id, name, category FROM products WHERE id = $1")
        .bind(quotation.product_id)
        .fetch_one(&mut *conn)
        .await?;
    let location = fetch_location(quotation.location_id, conn).await?;
    Ok(Some(QuotationContext { quotation, product, location }))
}

pub async fn fetch_location(id: i64, conn: &mut SqliteConnection) -> Result<Location, SqliteDatabaseError> {
    let location = sqlx::query_as::<_, Location>(
        "SELECT id, city, state, country, latitude, longitude, place_id FROM locations WHERE id = $1",
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(location)
}

pub async fn set_statuses(
    id: i64,
    status: QuotationStatus,
    processing_status: ProcessingStatus,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    trace!("🗃️ Quotation #{id} moving to {status}/{processing_status}");
    sqlx::query(
        "UPDATE quotations SET status = $1, processing_status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3",
    )
    .bind(status)
    .bind(processing_status)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Quotations abandoned mid-flight by a prior crash.
pub async fn stuck_quotation_ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, SqliteDatabaseError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM quotations WHERE processing_status = 'processing'")
        .fetch_all(conn)
        .await?;
    Ok(ids)
}
