//! Collaborator seams used by the rating pipeline.
//!
//! Production wiring lives in [`crate::adapters`]; tests substitute in-memory
//! implementations.

use std::future::Future;

use ratesync_core::ProductRatingSample;
use rust_decimal::Decimal;

/// Source of per-product review statistics for a vendor.
pub trait ReviewSource: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn vendor_products(
        &self,
        vendor_id: &str,
    ) -> impl Future<Output = Result<Vec<ProductRatingSample>, Self::Error>> + Send;
}

/// The vendor profile store.
pub trait RatingStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Ids of every live vendor, in a stable order.
    fn vendor_ids(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    /// Overwrites one vendor's rating. Must fail if the vendor does not exist.
    fn write_rating(
        &self,
        vendor_id: &str,
        rating: Decimal,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Distributed cache supporting pattern-based bulk deletion.
pub trait ListCache: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Deletes every key matching `pattern`, returning how many were removed.
    fn delete_matching(&self, pattern: &str)
        -> impl Future<Output = Result<u64, Self::Error>> + Send;
}
