//! Single-vendor rating recomputation.

use ratesync_core::aggregate_rating;
use rust_decimal::Decimal;

use crate::error::RatingError;
use crate::ports::{RatingStore, ReviewSource};

/// Recompute one vendor's rating from its products and persist it.
///
/// Returns `Ok(None)` when the vendor has no rated products; the stored
/// rating is left untouched in that case. Exactly one write happens on the
/// `Some` path and none otherwise.
///
/// # Errors
///
/// - [`RatingError::CollaboratorUnavailable`] if the review fetch fails.
/// - [`RatingError::InvalidSample`] if a rated product has a non-finite or
///   out-of-range rating.
/// - [`RatingError::PersistenceFailure`] if the write fails.
pub async fn compute_and_persist_rating<R, S>(
    reviews: &R,
    store: &S,
    vendor_id: &str,
) -> Result<Option<Decimal>, RatingError>
where
    R: ReviewSource,
    S: RatingStore,
{
    let samples = reviews.vendor_products(vendor_id).await.map_err(|e| {
        RatingError::CollaboratorUnavailable {
            vendor_id: vendor_id.to_string(),
            reason: e.to_string(),
        }
    })?;

    let aggregate = aggregate_rating(&samples).map_err(|e| RatingError::InvalidSample {
        vendor_id: vendor_id.to_string(),
        reason: e.to_string(),
    })?;

    let Some(rating) = aggregate else {
        tracing::debug!(
            vendor_id,
            products = samples.len(),
            "ratings: no rated products; stored rating left unchanged"
        );
        return Ok(None);
    };

    store
        .write_rating(vendor_id, rating)
        .await
        .map_err(|e| RatingError::PersistenceFailure {
            vendor_id: vendor_id.to_string(),
            reason: e.to_string(),
        })?;

    Ok(Some(rating))
}
