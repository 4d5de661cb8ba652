use ratesync_core::{MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

/// Per-vendor failure while recomputing a rating.
#[derive(Debug, Error)]
pub enum RatingError {
    /// The review service could not be reached or answered badly. No write
    /// was attempted.
    #[error("review service unavailable for vendor {vendor_id}: {reason}")]
    CollaboratorUnavailable { vendor_id: String, reason: String },

    /// The rating could not be written, including when the vendor row does
    /// not exist. The stored rating is unchanged.
    #[error("failed to persist rating for vendor {vendor_id}: {reason}")]
    PersistenceFailure { vendor_id: String, reason: String },

    /// The review payload carried a value that cannot be averaged.
    #[error("invalid review data for vendor {vendor_id}: {reason}")]
    InvalidSample { vendor_id: String, reason: String },
}

impl RatingError {
    #[must_use]
    pub fn vendor_id(&self) -> &str {
        match self {
            Self::CollaboratorUnavailable { vendor_id, .. }
            | Self::PersistenceFailure { vendor_id, .. }
            | Self::InvalidSample { vendor_id, .. } => vendor_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(
        "interval must be between {min} and {max} minutes, got {minutes}",
        min = MIN_INTERVAL_MINUTES,
        max = MAX_INTERVAL_MINUTES
    )]
    InvalidInterval { minutes: i64 },

    #[error("a full rating run is already in progress")]
    RunInProgress,

    #[error("job scheduler error: {0}")]
    Timer(#[from] JobSchedulerError),
}

/// Checks an interval request and narrows it to the stored width.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidInterval`] when `minutes` is outside
/// `MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES`.
pub fn validate_interval(minutes: i64) -> Result<u32, SchedulerError> {
    u32::try_from(minutes)
        .ok()
        .filter(|m| (MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(m))
        .ok_or(SchedulerError::InvalidInterval { minutes })
}
