//! Vendor-level rating aggregation.
//!
//! A vendor's rating is the arithmetic mean of the `average_rating` of every
//! product that has at least one review, rounded half away from zero to two
//! decimal places. Products with no reviews contribute to neither the
//! numerator nor the denominator.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Number of decimal places kept on a persisted vendor rating.
pub const RATING_SCALE: u32 = 2;

/// Largest rating a `NUMERIC(4, 2)` column can hold, in hundredths.
const MAX_RATING_HUNDREDTHS: i64 = 9_999;

/// Review statistics for a single product, as reported by the review service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRatingSample {
    pub product_id: String,
    pub average_rating: f64,
    pub review_count: u64,
}

impl ProductRatingSample {
    #[must_use]
    pub fn is_rated(&self) -> bool {
        self.review_count > 0
    }
}

/// Compute the vendor rating from its products' review statistics.
///
/// Returns `Ok(None)` when no product has any reviews. That outcome is
/// distinct from `Ok(Some(0.00))`, which is a real rating.
///
/// # Errors
///
/// Returns [`CoreError::InvalidRating`] if a rated product carries a
/// non-finite `average_rating` or one outside `0.00..=99.99`.
pub fn aggregate_rating(samples: &[ProductRatingSample]) -> Result<Option<Decimal>, CoreError> {
    let mut sum = Decimal::ZERO;
    let mut count: u64 = 0;

    for sample in samples.iter().filter(|s| s.is_rated()) {
        sum = sum
            .checked_add(to_decimal(sample)?)
            .ok_or_else(|| invalid_rating(sample))?;
        count += 1;
    }

    if count == 0 {
        return Ok(None);
    }

    Ok(Some(round_rating(sum / Decimal::from(count))))
}

/// Round half away from zero to [`RATING_SCALE`] places, always keeping the
/// full scale (`4` becomes `4.00`).
#[must_use]
pub fn round_rating(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(RATING_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATING_SCALE);
    rounded
}

// Goes through the shortest round-trip string form so that `4.333` is
// exactly 4.333 rather than its nearest binary approximation.
fn to_decimal(sample: &ProductRatingSample) -> Result<Decimal, CoreError> {
    if !sample.average_rating.is_finite() {
        return Err(invalid_rating(sample));
    }

    let value = Decimal::from_str(&sample.average_rating.to_string())
        .map_err(|_| invalid_rating(sample))?;
    let max = Decimal::new(MAX_RATING_HUNDREDTHS, RATING_SCALE);
    if value < Decimal::ZERO || value > max {
        return Err(invalid_rating(sample));
    }
    Ok(value)
}

fn invalid_rating(sample: &ProductRatingSample) -> CoreError {
    CoreError::InvalidRating {
        product_id: sample.product_id.clone(),
        value: sample.average_rating,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, average_rating: f64, review_count: u64) -> ProductRatingSample {
        ProductRatingSample {
            product_id: id.to_string(),
            average_rating,
            review_count,
        }
    }

    #[test]
    fn empty_product_list_has_no_rating() {
        assert_eq!(aggregate_rating(&[]).unwrap(), None);
    }

    #[test]
    fn only_unrated_products_has_no_rating() {
        let samples = [sample("p1", 5.0, 0), sample("p2", 0.0, 0)];
        assert_eq!(aggregate_rating(&samples).unwrap(), None);
    }

    #[test]
    fn unrated_products_are_excluded_from_mean() {
        let samples = [sample("p1", 5.0, 0), sample("p2", 4.0, 3)];
        assert_eq!(aggregate_rating(&samples).unwrap(), Some(Decimal::new(400, 2)));
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        // mean is exactly 4.4995
        let samples = [sample("p1", 4.333, 1), sample("p2", 4.666, 1)];
        assert_eq!(aggregate_rating(&samples).unwrap(), Some(Decimal::new(450, 2)));
    }

    #[test]
    fn mean_below_midpoint_rounds_down() {
        // mean is 4.4945
        let samples = [sample("p1", 4.333, 2), sample("p2", 4.656, 9)];
        assert_eq!(aggregate_rating(&samples).unwrap(), Some(Decimal::new(449, 2)));

        let samples = [sample("p1", 1.0, 1), sample("p2", 1.0, 1), sample("p3", 2.0, 1)];
        assert_eq!(aggregate_rating(&samples).unwrap(), Some(Decimal::new(133, 2)));
    }

    #[test]
    fn zero_average_is_a_real_rating() {
        let samples = [sample("p1", 0.0, 4), sample("p2", 0.0, 1)];
        let rating = aggregate_rating(&samples).unwrap();
        assert_eq!(rating, Some(Decimal::ZERO));
    }

    #[test]
    fn review_count_does_not_weight_the_mean() {
        let samples = [sample("p1", 5.0, 2), sample("p2", 3.0, 4), sample("p3", 1.0, 0)];
        assert_eq!(aggregate_rating(&samples).unwrap(), Some(Decimal::new(400, 2)));
    }

    #[test]
    fn non_finite_rating_is_rejected() {
        let samples = [sample("bad", f64::NAN, 3)];
        let err = aggregate_rating(&samples).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRating { ref product_id, .. } if product_id == "bad"));
    }

    #[test]
    fn huge_finite_ratings_are_rejected_without_overflow() {
        let samples = [sample("big-1", 5e28, 1), sample("big-2", 5e28, 1)];
        let err = aggregate_rating(&samples).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRating { ref product_id, .. } if product_id == "big-1"));

        let samples = [sample("p1", 4.0, 1), sample("huge", 1e300, 1)];
        assert!(aggregate_rating(&samples).is_err());
    }

    #[test]
    fn rating_must_fit_the_stored_column() {
        let samples = [sample("p1", 99.99, 1), sample("p2", 99.99, 1)];
        assert_eq!(aggregate_rating(&samples).unwrap(), Some(Decimal::new(9_999, 2)));

        let err = aggregate_rating(&[sample("over", 100.0, 1)]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRating { ref product_id, .. } if product_id == "over"));

        let err = aggregate_rating(&[sample("neg", -0.5, 1)]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRating { ref product_id, .. } if product_id == "neg"));
    }

    #[test]
    fn non_finite_rating_on_unrated_product_is_ignored() {
        let samples = [sample("bad", f64::INFINITY, 0), sample("ok", 2.5, 1)];
        assert_eq!(aggregate_rating(&samples).unwrap(), Some(Decimal::new(250, 2)));
    }

    #[test]
    fn round_rating_keeps_two_places() {
        assert_eq!(round_rating(Decimal::new(4, 0)).to_string(), "4.00");
        assert_eq!(round_rating(Decimal::new(-12_345, 4)).to_string(), "-1.23");
        assert_eq!(round_rating(Decimal::new(-1_235, 3)).to_string(), "-1.24");
    }
}
