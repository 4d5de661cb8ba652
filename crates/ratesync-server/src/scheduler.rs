//! Rating scheduler wiring and the boot-time start hook.

use std::{sync::Arc, time::Duration};

use ratesync_cache::RedisCache;
use ratesync_core::AppConfig;
use ratesync_engine::{
    live_pipeline, ListCache, LiveScheduler, RatingStore, ReviewSource, SchedulerService,
    SchedulerSettings,
};
use sqlx::PgPool;
use tokio::task::JoinHandle;

/// Builds the production rating scheduler in the stopped state.
///
/// # Errors
///
/// Returns an error if the review client cannot be built, the configured
/// interval is out of range, or the job scheduler cannot be initialised.
pub async fn build_scheduler(
    config: &AppConfig,
    pool: PgPool,
    cache: RedisCache,
) -> anyhow::Result<Arc<LiveScheduler>> {
    let pipeline = live_pipeline(config, pool, cache)?;
    let scheduler = SchedulerService::new(pipeline, SchedulerSettings::from_app_config(config)).await?;
    Ok(Arc::new(scheduler))
}

/// Starts the scheduler once `delay` has elapsed. Failures are logged; the
/// server keeps serving with the scheduler stopped.
pub fn spawn_boot_start<R, S, C>(
    scheduler: Arc<SchedulerService<R, S, C>>,
    delay: Duration,
) -> JoinHandle<()>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match scheduler.start().await {
            Ok(outcome) if outcome.success => {
                tracing::info!(message = %outcome.message, "scheduler: started on boot");
            }
            Ok(outcome) => {
                tracing::info!(message = %outcome.message, "scheduler: boot start skipped");
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduler: boot start failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stub_scheduler;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn boot_start_waits_then_starts() {
        let scheduler = stub_scheduler(&["v1"], Duration::ZERO).await;

        let handle = spawn_boot_start(Arc::clone(&scheduler), Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!scheduler.status().await.running);

        handle.await.expect("boot task");
        let status = scheduler.status().await;
        assert!(status.running);
        assert!(status.next_run.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn boot_start_leaves_running_scheduler_alone() {
        let scheduler = stub_scheduler(&["v1"], Duration::ZERO).await;
        assert!(scheduler.start().await.expect("start").success);

        spawn_boot_start(Arc::clone(&scheduler), Duration::ZERO)
            .await
            .expect("boot task");

        assert!(scheduler.status().await.running);
    }
}
