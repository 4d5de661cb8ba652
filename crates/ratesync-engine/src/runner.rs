//! Batch rating runs over many vendors.
//!
//! Vendors are processed in fixed-size chunks. Every vendor in a chunk runs
//! concurrently and the chunk settles before the next one begins; a fixed
//! delay separates consecutive chunks to bound the load on the review
//! service.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use ratesync_core::AppConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::RatingError;
use crate::ports::{ListCache, RatingStore, ReviewSource};
use crate::rating::compute_and_persist_rating;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl RunnerSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.rating_batch_size.max(1),
            batch_delay: Duration::from_millis(config.rating_batch_delay_ms),
        }
    }
}

/// A vendor whose rating could not be recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorFailure {
    pub vendor_id: String,
    pub reason: String,
}

/// Outcome of one batch run.
///
/// `successful + errors + skipped == processed_vendors` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRunSummary {
    pub processed_vendors: usize,
    pub successful: usize,
    pub errors: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub failures: Vec<VendorFailure>,
    /// Set when the run could not get going at all, e.g. the vendor list
    /// failed to load.
    pub error: Option<String>,
}

impl BatchRunSummary {
    pub(crate) fn aborted(reason: String, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            error: Some(reason),
            ..Self::default()
        }
    }

    fn record(&mut self, vendor_id: &str, outcome: Result<Option<Decimal>, RatingError>) {
        match outcome {
            Ok(Some(rating)) => {
                self.successful += 1;
                tracing::debug!(vendor_id, %rating, "ratings: vendor rating updated");
            }
            Ok(None) => {
                self.skipped += 1;
            }
            Err(e) => {
                self.errors += 1;
                tracing::warn!(vendor_id, error = %e, "ratings: vendor rating failed");
                self.failures.push(VendorFailure {
                    vendor_id: vendor_id.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// The rating pipeline: review source, profile store and listing cache, plus
/// the batching policy applied on top of them.
pub struct RatingPipeline<R, S, C> {
    reviews: R,
    store: S,
    pub(crate) cache: C,
    settings: RunnerSettings,
}

impl<R, S, C> RatingPipeline<R, S, C>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    pub fn new(reviews: R, store: S, cache: C, settings: RunnerSettings) -> Self {
        let settings = RunnerSettings {
            batch_size: settings.batch_size.max(1),
            ..settings
        };
        Self {
            reviews,
            store,
            cache,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> RunnerSettings {
        self.settings
    }

    /// Recompute and persist a single vendor's rating.
    ///
    /// # Errors
    ///
    /// See [`compute_and_persist_rating`].
    pub async fn compute_rating(&self, vendor_id: &str) -> Result<Option<Decimal>, RatingError> {
        compute_and_persist_rating(&self.reviews, &self.store, vendor_id).await
    }

    /// Recompute every live vendor's rating.
    ///
    /// The vendor list is read once up front; vendors added mid-run wait for
    /// the next run. Never fails: per-vendor problems are counted and a
    /// failure to load the vendor list is reported through
    /// [`BatchRunSummary::error`].
    pub async fn run_for_all_vendors(&self) -> BatchRunSummary {
        let started = Instant::now();

        let vendor_ids = match self.store.vendor_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "ratings: failed to load vendor ids");
                return BatchRunSummary::aborted(
                    format!("failed to load vendor ids: {e}"),
                    elapsed_ms(started),
                );
            }
        };

        if vendor_ids.is_empty() {
            tracing::info!("ratings: no vendors to process");
        }

        self.process(&vendor_ids, started).await
    }

    /// Recompute the given vendors only, then invalidate the listing caches.
    ///
    /// Duplicate ids are processed once, in first-seen order.
    pub async fn run_for_vendors(&self, vendor_ids: &[String]) -> BatchRunSummary {
        let started = Instant::now();

        let mut seen = HashSet::with_capacity(vendor_ids.len());
        let unique: Vec<String> = vendor_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let summary = self.process(&unique, started).await;
        self.invalidate_vendor_list_caches().await;
        summary
    }

    async fn process(&self, vendor_ids: &[String], started: Instant) -> BatchRunSummary {
        let batch_size = self.settings.batch_size;
        let chunk_count = vendor_ids.len().div_ceil(batch_size);

        let mut summary = BatchRunSummary {
            processed_vendors: vendor_ids.len(),
            ..BatchRunSummary::default()
        };

        for (index, chunk) in vendor_ids.chunks(batch_size).enumerate() {
            if index > 0 && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }

            tracing::debug!(
                chunk = index + 1,
                chunks = chunk_count,
                size = chunk.len(),
                "ratings: processing chunk"
            );

            let outcomes = join_all(chunk.iter().map(|vendor_id| async move {
                (vendor_id, self.compute_rating(vendor_id).await)
            }))
            .await;

            for (vendor_id, outcome) in outcomes {
                summary.record(vendor_id, outcome);
            }
        }

        summary.duration_ms = elapsed_ms(started);

        tracing::info!(
            processed = summary.processed_vendors,
            successful = summary.successful,
            errors = summary.errors,
            skipped = summary.skipped,
            duration_ms = summary.duration_ms,
            "ratings: batch run complete"
        );

        summary
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
