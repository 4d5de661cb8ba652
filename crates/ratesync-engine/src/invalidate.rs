//! Listing-cache invalidation after rating runs.

use ratesync_cache::VENDOR_LIST_PATTERN;

use crate::ports::{ListCache, RatingStore, ReviewSource};
use crate::runner::RatingPipeline;

/// Delete every cached vendor listing.
///
/// # Errors
///
/// Returns the cache's error unchanged; callers decide whether it matters.
pub async fn invalidate_vendor_list_caches<C: ListCache>(cache: &C) -> Result<u64, C::Error> {
    cache.delete_matching(VENDOR_LIST_PATTERN).await
}

impl<R, S, C> RatingPipeline<R, S, C>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    /// Best-effort invalidation of cached vendor listings.
    ///
    /// A failure is logged and dropped; stale listings expire on their own
    /// and the ratings themselves are already persisted.
    pub async fn invalidate_vendor_list_caches(&self) {
        match invalidate_vendor_list_caches(&self.cache).await {
            Ok(deleted) => {
                tracing::info!(
                    pattern = VENDOR_LIST_PATTERN,
                    deleted,
                    "cache: vendor list caches invalidated"
                );
            }
            Err(e) => {
                tracing::warn!(
                    pattern = VENDOR_LIST_PATTERN,
                    error = %e,
                    "cache: vendor list invalidation failed; continuing"
                );
            }
        }
    }
}
