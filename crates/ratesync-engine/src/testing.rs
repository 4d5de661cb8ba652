//! In-memory collaborators for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ratesync_core::ProductRatingSample;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::time::Instant;

use crate::ports::{ListCache, RatingStore, ReviewSource};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FakeError(pub String);

pub fn sample(id: &str, average_rating: f64, review_count: u64) -> ProductRatingSample {
    ProductRatingSample {
        product_id: id.to_string(),
        average_rating,
        review_count,
    }
}

/// Review source backed by a fixed map. Unknown vendors have no products.
#[derive(Clone, Default)]
pub struct FakeReviews {
    products: HashMap<String, Vec<ProductRatingSample>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delay: Duration,
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeReviews {
    pub fn with_vendor(mut self, vendor_id: &str, samples: Vec<ProductRatingSample>) -> Self {
        self.products.insert(vendor_id.to_string(), samples);
        self
    }

    pub fn failing(mut self, vendor_id: &str) -> Self {
        self.failing.insert(vendor_id.to_string());
        self
    }

    pub fn panicking(mut self, vendor_id: &str) -> Self {
        self.panicking.insert(vendor_id.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ReviewSource for FakeReviews {
    type Error = FakeError;

    async fn vendor_products(
        &self,
        vendor_id: &str,
    ) -> Result<Vec<ProductRatingSample>, FakeError> {
        self.calls
            .lock()
            .unwrap()
            .push((vendor_id.to_string(), Instant::now()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        assert!(
            !self.panicking.contains(vendor_id),
            "review source exploded for {vendor_id}"
        );
        if self.failing.contains(vendor_id) {
            return Err(FakeError(format!("connection refused for {vendor_id}")));
        }
        Ok(self.products.get(vendor_id).cloned().unwrap_or_default())
    }
}

/// Profile store holding a fixed vendor list and a mutable rating map.
#[derive(Clone, Default)]
pub struct FakeStore {
    ids: Vec<String>,
    ratings: Arc<tokio::sync::Mutex<HashMap<String, Decimal>>>,
    writes: Arc<AtomicUsize>,
    fail_listing: bool,
    fail_writes: HashSet<String>,
}

impl FakeStore {
    pub fn with_vendors(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| (*id).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_vendor_count(count: usize) -> Self {
        Self {
            ids: (1..=count).map(|i| format!("v{i:02}")).collect(),
            ..Self::default()
        }
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_writes(mut self, vendor_id: &str) -> Self {
        self.fail_writes.insert(vendor_id.to_string());
        self
    }

    pub async fn seed_rating(&self, vendor_id: &str, rating: Decimal) {
        self.ratings
            .lock()
            .await
            .insert(vendor_id.to_string(), rating);
    }

    pub async fn rating(&self, vendor_id: &str) -> Option<Decimal> {
        self.ratings.lock().await.get(vendor_id).copied()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl RatingStore for FakeStore {
    type Error = FakeError;

    async fn vendor_ids(&self) -> Result<Vec<String>, FakeError> {
        if self.fail_listing {
            return Err(FakeError("database unavailable".to_string()));
        }
        Ok(self.ids.clone())
    }

    async fn write_rating(&self, vendor_id: &str, rating: Decimal) -> Result<(), FakeError> {
        if self.fail_writes.contains(vendor_id) {
            return Err(FakeError("write rejected".to_string()));
        }
        if !self.ids.iter().any(|id| id == vendor_id) {
            return Err(FakeError("record not found".to_string()));
        }
        self.ratings
            .lock()
            .await
            .insert(vendor_id.to_string(), rating);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Cache that records invalidation requests.
#[derive(Clone, Default)]
pub struct FakeCache {
    patterns: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl FakeCache {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn patterns(&self) -> Vec<String> {
        self.patterns.lock().unwrap().clone()
    }
}

impl ListCache for FakeCache {
    type Error = FakeError;

    async fn delete_matching(&self, pattern: &str) -> Result<u64, FakeError> {
        self.patterns.lock().unwrap().push(pattern.to_string());
        if self.fail {
            return Err(FakeError("cache unreachable".to_string()));
        }
        Ok(0)
    }
}

pub fn app_config() -> ratesync_core::AppConfig {
    ratesync_core::AppConfig {
        database_url: "postgres://localhost/ratesync_test".to_string(),
        redis_url: "redis://127.0.0.1:6379".to_string(),
        reviews_url: "http://reviews.local".to_string(),
        env: ratesync_core::Environment::Test,
        bind_addr: std::net::SocketAddr::from(([127, 0, 0, 1], 3000)),
        log_level: "debug".to_string(),
        api_keys: Vec::new(),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        reviews_timeout_secs: 10,
        reviews_user_agent: "ratesync-test/0.1".to_string(),
        rating_interval_minutes: 60,
        rating_batch_size: 10,
        rating_batch_delay_ms: 1000,
        scheduler_warmup_secs: 10,
        scheduler_boot_delay_secs: 5,
        scheduler_autostart: true,
    }
}
