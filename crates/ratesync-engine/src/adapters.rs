//! Production implementations of the engine ports.

use ratesync_cache::{CacheError, RedisCache};
use ratesync_core::{AppConfig, ProductRatingSample};
use ratesync_db::DbError;
use ratesync_reviews::{ReviewsClient, ReviewsError};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::ports::{ListCache, RatingStore, ReviewSource};
use crate::runner::{RatingPipeline, RunnerSettings};
use crate::scheduler::SchedulerService;

pub type LivePipeline = RatingPipeline<ReviewsClient, PgRatingStore, RedisCache>;
pub type LiveScheduler = SchedulerService<ReviewsClient, PgRatingStore, RedisCache>;

impl ReviewSource for ReviewsClient {
    type Error = ReviewsError;

    async fn vendor_products(
        &self,
        vendor_id: &str,
    ) -> Result<Vec<ProductRatingSample>, ReviewsError> {
        ReviewsClient::vendor_products(self, vendor_id).await
    }
}

/// `vendor_profiles` in Postgres.
#[derive(Debug, Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RatingStore for PgRatingStore {
    type Error = DbError;

    async fn vendor_ids(&self) -> Result<Vec<String>, DbError> {
        ratesync_db::list_vendor_ids(&self.pool).await
    }

    async fn write_rating(&self, vendor_id: &str, rating: Decimal) -> Result<(), DbError> {
        ratesync_db::update_vendor_rating(&self.pool, vendor_id, rating).await
    }
}

impl ListCache for RedisCache {
    type Error = CacheError;

    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        RedisCache::delete_matching(self, pattern).await
    }
}

/// Wire the production pipeline from configuration.
///
/// # Errors
///
/// Returns [`ReviewsError`] if the review client cannot be built from
/// `config.reviews_url`.
pub fn live_pipeline(
    config: &AppConfig,
    pool: PgPool,
    cache: RedisCache,
) -> Result<LivePipeline, ReviewsError> {
    let reviews = ReviewsClient::new(
        &config.reviews_url,
        config.reviews_timeout_secs,
        &config.reviews_user_agent,
    )?;

    Ok(RatingPipeline::new(
        reviews,
        PgRatingStore::new(pool),
        cache,
        RunnerSettings::from_app_config(config),
    ))
}
