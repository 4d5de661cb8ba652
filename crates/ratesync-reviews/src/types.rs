//! Wire types for the product-review service.

use ratesync_core::ProductRatingSample;
use serde::Deserialize;

/// Body of `GET /vendor/{vendorId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorProductsResponse {
    #[serde(default)]
    pub products: Vec<ReviewedProduct>,
}

/// A single product with its review statistics.
///
/// Missing statistics are treated as "no reviews yet".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedProduct {
    #[serde(alias = "_id")]
    pub product_id: String,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: u64,
}

impl From<ReviewedProduct> for ProductRatingSample {
    fn from(p: ReviewedProduct) -> Self {
        Self {
            product_id: p.product_id,
            average_rating: p.average_rating,
            review_count: p.review_count,
        }
    }
}
