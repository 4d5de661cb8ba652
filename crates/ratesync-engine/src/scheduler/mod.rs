//! Recurring rating scheduler.
//!
//! [`SchedulerService`] owns a [`JobScheduler`] holding at most one repeated
//! job: the full rating run. Starting arms that job and a one-off warm-up
//! run; stopping removes the job. Runs already in flight always finish.
//!
//! Only one full run executes at a time. Timer and warm-up firings that land
//! while a run is in flight are skipped and counted; manual full runs are
//! refused with [`SchedulerError::RunInProgress`].

mod stats;

pub use stats::{
    DetailedStatus, RunRecord, RunTrigger, SchedulerRunStats, SchedulerStatus,
    RECENT_RUNS_CAPACITY,
};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use ratesync_core::AppConfig;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::error::{validate_interval, SchedulerError};
use crate::ports::{ListCache, RatingStore, ReviewSource};
use crate::runner::{elapsed_ms, BatchRunSummary, RatingPipeline};
use stats::RunLedger;

const DEFAULT_INTERVAL_MINUTES: u32 = 60;
const DEFAULT_WARMUP_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);
const ONE_MINUTE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Initial interval; changed at runtime through `set_interval`.
    pub interval_minutes: u32,
    pub warmup_delay: Duration,
    pub restart_delay: Duration,
    /// Wall-clock length of one interval minute.
    pub minute: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            warmup_delay: DEFAULT_WARMUP_DELAY,
            restart_delay: DEFAULT_RESTART_DELAY,
            minute: ONE_MINUTE,
        }
    }
}

impl SchedulerSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            interval_minutes: config.rating_interval_minutes,
            warmup_delay: Duration::from_secs(config.scheduler_warmup_secs),
            ..Self::default()
        }
    }

    fn period(&self, minutes: u32) -> Duration {
        self.minute * minutes
    }
}

/// Result of a control operation. `success == false` means the scheduler
/// was already in the requested state and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerOutcome {
    pub success: bool,
    pub message: String,
}

impl SchedulerOutcome {
    fn applied(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// State shared between the service and the jobs it spawns.
struct RunContext<R, S, C> {
    pipeline: RatingPipeline<R, S, C>,
    ledger: Mutex<RunLedger>,
    in_flight: AtomicBool,
    /// Bumped on every start and stop; a pending warm-up run only fires if
    /// the generation it was armed under is still current.
    generation: AtomicU64,
}

/// Holds the run-in-progress flag for as long as it lives.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R, S, C> RunContext<R, S, C>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    /// Full run followed by cache invalidation, recorded in the ledger.
    ///
    /// The run itself executes on its own task so that a panic anywhere in
    /// the pipeline is contained and recorded as the run's error.
    async fn execute_full_run(
        self: &Arc<Self>,
        trigger: RunTrigger,
    ) -> Result<BatchRunSummary, SchedulerError> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return Err(SchedulerError::RunInProgress);
        };

        let run_id = self.ledger.lock().await.issue_run_id();
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(run_id, %trigger, "scheduler: rating run started");

        let ctx = Arc::clone(self);
        let joined = tokio::spawn(async move {
            let summary = ctx.pipeline.run_for_all_vendors().await;
            ctx.pipeline.invalidate_vendor_list_caches().await;
            summary
        })
        .await;

        let summary = match joined {
            Ok(summary) => summary,
            Err(e) => {
                let reason = describe_join_error(e);
                tracing::error!(run_id, %trigger, error = %reason, "scheduler: rating run aborted");
                BatchRunSummary::aborted(reason, elapsed_ms(clock))
            }
        };

        let record = RunRecord::new(run_id, trigger, started_at, Utc::now(), &summary);
        self.ledger.lock().await.record(record);

        tracing::info!(
            run_id,
            %trigger,
            processed = summary.processed_vendors,
            successful = summary.successful,
            errors = summary.errors,
            skipped = summary.skipped,
            duration_ms = summary.duration_ms,
            "scheduler: rating run complete"
        );

        Ok(summary)
    }

    /// Entry point for timer and warm-up firings.
    async fn fire(self: Arc<Self>, trigger: RunTrigger) {
        match self.execute_full_run(trigger).await {
            Ok(_) => {}
            Err(SchedulerError::RunInProgress) => {
                self.ledger.lock().await.note_skipped_firing();
                tracing::warn!(%trigger, "scheduler: previous run still in progress; firing skipped");
            }
            Err(e) => {
                tracing::error!(%trigger, error = %e, "scheduler: rating run failed");
            }
        }
    }
}

/// Owns the recurring rating timer and the run history.
pub struct SchedulerService<R, S, C> {
    ctx: Arc<RunContext<R, S, C>>,
    scheduler: JobScheduler,
    /// Id of the armed repeated job. The lock also serialises control
    /// operations.
    job_id: Mutex<Option<Uuid>>,
    settings: SchedulerSettings,
}

impl<R, S, C> SchedulerService<R, S, C>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    /// Creates a stopped scheduler around `pipeline`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidInterval`] if the configured interval
    /// is out of range, or [`SchedulerError::Timer`] if the job scheduler
    /// cannot be initialised.
    pub async fn new(
        pipeline: RatingPipeline<R, S, C>,
        settings: SchedulerSettings,
    ) -> Result<Self, SchedulerError> {
        let interval_minutes = validate_interval(i64::from(settings.interval_minutes))?;

        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;

        Ok(Self {
            ctx: Arc::new(RunContext {
                pipeline,
                ledger: Mutex::new(RunLedger::new(interval_minutes)),
                in_flight: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
            scheduler,
            job_id: Mutex::new(None),
            settings,
        })
    }

    #[must_use]
    pub fn pipeline(&self) -> &RatingPipeline<R, S, C> {
        &self.ctx.pipeline
    }

    #[must_use]
    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    /// Arms the recurring run and schedules the warm-up run.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Timer`] if the job cannot be registered.
    pub async fn start(&self) -> Result<SchedulerOutcome, SchedulerError> {
        let mut slot = self.job_id.lock().await;
        if slot.is_some() {
            return Ok(SchedulerOutcome::rejected("rating scheduler is already running"));
        }

        let minutes = self.ctx.ledger.lock().await.interval_minutes;
        self.arm(&mut slot, minutes).await?;
        Ok(SchedulerOutcome::applied(format!(
            "rating scheduler started; running every {minutes} minute(s)"
        )))
    }

    /// Cancels the recurring run. A run already in flight finishes.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Timer`] if the job cannot be removed; the
    /// scheduler stays running in that case.
    pub async fn stop(&self) -> Result<SchedulerOutcome, SchedulerError> {
        let mut slot = self.job_id.lock().await;
        if self.disarm(&mut slot).await? {
            Ok(SchedulerOutcome::applied("rating scheduler stopped"))
        } else {
            Ok(SchedulerOutcome::rejected("rating scheduler is not running"))
        }
    }

    /// Stop (when running), wait the restart delay, then start.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Timer`] if the job cannot be replaced.
    pub async fn restart(&self) -> Result<SchedulerOutcome, SchedulerError> {
        let mut slot = self.job_id.lock().await;
        let minutes = self.ctx.ledger.lock().await.interval_minutes;
        self.cycle(&mut slot, minutes).await?;
        Ok(SchedulerOutcome::applied(format!(
            "rating scheduler restarted; running every {minutes} minute(s)"
        )))
    }

    /// Changes the run interval. A running scheduler is restarted so the new
    /// interval applies immediately; a stopped one keeps it for the next start.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidInterval`] without touching any state
    /// when `minutes` is out of range, or [`SchedulerError::Timer`] if the
    /// job cannot be replaced. The stored interval only changes once a job
    /// is armed with it, so a timer failure leaves the previous interval.
    pub async fn set_interval(&self, minutes: i64) -> Result<SchedulerOutcome, SchedulerError> {
        let minutes = validate_interval(minutes)?;

        let mut slot = self.job_id.lock().await;
        if slot.is_some() {
            self.cycle(&mut slot, minutes).await?;
            tracing::info!(interval_minutes = minutes, "scheduler: interval updated");
            return Ok(SchedulerOutcome::applied(format!(
                "interval set to {minutes} minute(s); scheduler restarted"
            )));
        }

        self.ctx.ledger.lock().await.interval_minutes = minutes;
        tracing::info!(interval_minutes = minutes, "scheduler: interval updated");
        Ok(SchedulerOutcome::applied(format!(
            "interval set to {minutes} minute(s); applies on next start"
        )))
    }

    pub async fn status(&self) -> SchedulerStatus {
        let run_in_progress = self.ctx.in_flight.load(Ordering::Acquire);
        self.ctx.ledger.lock().await.status(run_in_progress)
    }

    pub async fn detailed_status(&self) -> DetailedStatus {
        let run_in_progress = self.ctx.in_flight.load(Ordering::Acquire);
        let runner = self.ctx.pipeline.settings();
        let ledger = self.ctx.ledger.lock().await;

        DetailedStatus {
            status: ledger.status(run_in_progress),
            batch_size: runner.batch_size,
            batch_delay_ms: u64::try_from(runner.batch_delay.as_millis()).unwrap_or(u64::MAX),
            warmup_delay_secs: self.settings.warmup_delay.as_secs(),
            total_runs: ledger.total_runs(),
            skipped_firings: ledger.skipped_firings(),
            last_run: ledger.last_run().cloned(),
        }
    }

    pub async fn stats(&self) -> SchedulerRunStats {
        self.ctx.ledger.lock().await.stats()
    }

    /// Runs a full pass now, outside the timer.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::RunInProgress`] if a full run is in flight.
    pub async fn trigger_full_run(&self) -> Result<BatchRunSummary, SchedulerError> {
        self.ctx.execute_full_run(RunTrigger::Manual).await
    }

    /// Runs the given vendors now. Not subject to the in-flight guard and not
    /// recorded in the run history.
    pub async fn trigger_vendor_run(&self, vendor_ids: &[String]) -> BatchRunSummary {
        self.ctx.pipeline.run_for_vendors(vendor_ids).await
    }

    /// Stops the timer and shuts the job scheduler down.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Timer`] if the job scheduler fails to stop.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        let mut slot = self.job_id.lock().await;
        self.disarm(&mut slot).await?;

        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        tracing::info!("scheduler: job scheduler shut down");
        Ok(())
    }

    /// Registers the repeated job at `minutes` and, only once that succeeds,
    /// records `minutes` as the current interval.
    async fn arm(&self, slot: &mut Option<Uuid>, minutes: u32) -> Result<(), SchedulerError> {
        let period = self.settings.period(minutes);

        let ctx = Arc::clone(&self.ctx);
        let job = Job::new_repeated_async(period, move |_uuid, _lock| {
            let ctx = Arc::clone(&ctx);

            Box::pin(async move {
                {
                    let mut ledger = ctx.ledger.lock().await;
                    if ledger.running {
                        ledger.next_run = next_after(period);
                    }
                }
                ctx.fire(RunTrigger::Scheduled).await;
            })
        })?;

        *slot = Some(self.scheduler.add(job).await?);

        let generation = self.ctx.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut ledger = self.ctx.ledger.lock().await;
            ledger.interval_minutes = minutes;
            ledger.mark_started(next_after(period));
        }
        self.spawn_warmup(generation);

        tracing::info!(
            interval_minutes = minutes,
            warmup_secs = self.settings.warmup_delay.as_secs(),
            "scheduler: rating scheduler started"
        );
        Ok(())
    }

    /// Returns `false` if nothing was armed.
    async fn disarm(&self, slot: &mut Option<Uuid>) -> Result<bool, SchedulerError> {
        let Some(id) = slot.take() else {
            return Ok(false);
        };

        if let Err(e) = self.scheduler.remove(&id).await {
            *slot = Some(id);
            return Err(e.into());
        }

        self.ctx.generation.fetch_add(1, Ordering::SeqCst);
        self.ctx.ledger.lock().await.mark_stopped();
        tracing::info!("scheduler: rating scheduler stopped");
        Ok(true)
    }

    async fn cycle(&self, slot: &mut Option<Uuid>, minutes: u32) -> Result<(), SchedulerError> {
        if self.disarm(slot).await? {
            tokio::time::sleep(self.settings.restart_delay).await;
        }
        self.arm(slot, minutes).await
    }

    fn spawn_warmup(&self, generation: u64) {
        let ctx = Arc::clone(&self.ctx);
        let delay = self.settings.warmup_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if ctx.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("scheduler: warm-up run dropped; scheduler was stopped or restarted");
                return;
            }
            ctx.fire(RunTrigger::Warmup).await;
        });
    }
}

fn next_after(period: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(period)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
}

fn describe_join_error(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return format!("rating run was cancelled: {err}");
    }

    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("rating run panicked: {message}")
}
