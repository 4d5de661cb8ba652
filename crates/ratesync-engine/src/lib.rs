//! Vendor rating aggregation: per-vendor recomputation, batched runs over all
//! vendors, listing-cache invalidation and the recurring scheduler that ties
//! them together.

pub mod adapters;
pub mod error;
pub mod invalidate;
pub mod ports;
pub mod rating;
pub mod runner;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use adapters::{live_pipeline, LivePipeline, LiveScheduler, PgRatingStore};
pub use error::{validate_interval, RatingError, SchedulerError};
pub use invalidate::invalidate_vendor_list_caches;
pub use ports::{ListCache, RatingStore, ReviewSource};
pub use rating::compute_and_persist_rating;
pub use runner::{BatchRunSummary, RatingPipeline, RunnerSettings, VendorFailure};
pub use scheduler::{
    DetailedStatus, RunRecord, RunTrigger, SchedulerOutcome, SchedulerRunStats,
    SchedulerService, SchedulerSettings, SchedulerStatus,
};
