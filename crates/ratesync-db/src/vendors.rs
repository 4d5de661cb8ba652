//! Database operations for the rating columns of `vendor_profiles`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// The rating-related subset of a `vendor_profiles` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorRatingRow {
    pub vendor_id: String,
    pub rating: Decimal,
    pub rating_updated_at: Option<DateTime<Utc>>,
}

/// Returns the ids of all non-deleted vendors, in creation order.
///
/// The result is a snapshot; vendors created after the query are not included.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_vendor_ids(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT vendor_id FROM vendor_profiles \
         WHERE deleted_at IS NULL \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Returns the stored rating for a vendor, or `None` if no such vendor exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_vendor_rating(
    pool: &PgPool,
    vendor_id: &str,
) -> Result<Option<VendorRatingRow>, DbError> {
    let row = sqlx::query_as::<_, VendorRatingRow>(
        "SELECT vendor_id, rating, rating_updated_at \
         FROM vendor_profiles \
         WHERE vendor_id = $1 AND deleted_at IS NULL",
    )
    .bind(vendor_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Overwrites a vendor's aggregate rating and stamps `rating_updated_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live vendor has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_vendor_rating(
    pool: &PgPool,
    vendor_id: &str,
    rating: Decimal,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE vendor_profiles \
         SET rating = $1, rating_updated_at = NOW(), updated_at = NOW() \
         WHERE vendor_id = $2 AND deleted_at IS NULL",
    )
    .bind(rating)
    .bind(vendor_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
