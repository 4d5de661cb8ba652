//! In-memory collaborators for exercising the HTTP surface and boot hook.

use std::{collections::HashMap, io, sync::Arc, sync::Mutex, time::Duration};

use ratesync_core::ProductRatingSample;
use ratesync_engine::{
    ListCache, RatingPipeline, RatingStore, ReviewSource, RunnerSettings, SchedulerService,
    SchedulerSettings,
};
use rust_decimal::Decimal;

pub(crate) type StubScheduler = SchedulerService<StubReviews, StubStore, StubCache>;

/// Every vendor has one product rated 4.0 over three reviews.
pub(crate) struct StubReviews {
    delay: Duration,
}

impl ReviewSource for StubReviews {
    type Error = io::Error;

    async fn vendor_products(&self, vendor_id: &str) -> io::Result<Vec<ProductRatingSample>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![ProductRatingSample {
            product_id: format!("{vendor_id}-p1"),
            average_rating: 4.0,
            review_count: 3,
        }])
    }
}

pub(crate) struct StubStore {
    ratings: Mutex<HashMap<String, Decimal>>,
}

impl RatingStore for StubStore {
    type Error = io::Error;

    async fn vendor_ids(&self) -> io::Result<Vec<String>> {
        let mut ids: Vec<String> = self.ratings.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn write_rating(&self, vendor_id: &str, rating: Decimal) -> io::Result<()> {
        match self.ratings.lock().unwrap().get_mut(vendor_id) {
            Some(slot) => {
                *slot = rating;
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such vendor")),
        }
    }
}

pub(crate) struct StubCache;

impl ListCache for StubCache {
    type Error = io::Error;

    async fn delete_matching(&self, _pattern: &str) -> io::Result<u64> {
        Ok(0)
    }
}

/// A stopped scheduler over `vendor_ids` with a 60 minute interval and a
/// warm-up far enough out that it never fires during a test.
pub(crate) async fn stub_scheduler(vendor_ids: &[&str], delay: Duration) -> Arc<StubScheduler> {
    let store = StubStore {
        ratings: Mutex::new(
            vendor_ids
                .iter()
                .map(|id| ((*id).to_string(), Decimal::ZERO))
                .collect(),
        ),
    };
    let pipeline = RatingPipeline::new(
        StubReviews { delay },
        store,
        StubCache,
        RunnerSettings {
            batch_size: 10,
            batch_delay: Duration::ZERO,
        },
    );
    let settings = SchedulerSettings {
        interval_minutes: 60,
        warmup_delay: Duration::from_secs(600),
        restart_delay: Duration::from_millis(10),
        minute: Duration::from_secs(60),
    };

    Arc::new(
        SchedulerService::new(pipeline, settings)
            .await
            .expect("scheduler should build"),
    )
}
