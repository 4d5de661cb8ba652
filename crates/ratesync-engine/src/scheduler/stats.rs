//! Run history and status snapshots for the rating scheduler.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::runner::BatchRunSummary;

/// Number of completed runs kept in memory, newest first.
pub const RECENT_RUNS_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Scheduled,
    Warmup,
    Manual,
}

impl std::fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunTrigger::Scheduled => write!(f, "scheduled"),
            RunTrigger::Warmup => write!(f, "warmup"),
            RunTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// One completed full run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: u64,
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub processed_vendors: usize,
    pub successful: usize,
    pub errors: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

impl RunRecord {
    pub(crate) fn new(
        run_id: u64,
        trigger: RunTrigger,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        summary: &BatchRunSummary,
    ) -> Self {
        Self {
            run_id,
            trigger,
            started_at,
            finished_at,
            duration_ms: summary.duration_ms,
            processed_vendors: summary.processed_vendors,
            successful: summary.successful,
            errors: summary.errors,
            skipped: summary.skipped,
            error: summary.error.clone(),
        }
    }
}

/// Process-wide run statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerRunStats {
    pub total_runs: u64,
    pub skipped_firings: u64,
    pub last_run: Option<RunRecord>,
    pub next_run: Option<DateTime<Utc>>,
    pub recent_runs: Vec<RunRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_minutes: u32,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub run_in_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedStatus {
    #[serde(flatten)]
    pub status: SchedulerStatus,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub warmup_delay_secs: u64,
    pub total_runs: u64,
    pub skipped_firings: u64,
    pub last_run: Option<RunRecord>,
}

/// Mutable scheduler bookkeeping, guarded by the service's mutex.
#[derive(Debug)]
pub(crate) struct RunLedger {
    pub(crate) running: bool,
    pub(crate) interval_minutes: u32,
    pub(crate) next_run: Option<DateTime<Utc>>,
    last_run_id: u64,
    total_runs: u64,
    skipped_firings: u64,
    recent: VecDeque<RunRecord>,
}

impl RunLedger {
    pub(crate) fn new(interval_minutes: u32) -> Self {
        Self {
            running: false,
            interval_minutes,
            next_run: None,
            last_run_id: 0,
            total_runs: 0,
            skipped_firings: 0,
            recent: VecDeque::with_capacity(RECENT_RUNS_CAPACITY),
        }
    }

    pub(crate) fn issue_run_id(&mut self) -> u64 {
        self.last_run_id += 1;
        self.last_run_id
    }

    pub(crate) fn record(&mut self, run: RunRecord) {
        self.total_runs += 1;
        self.recent.push_front(run);
        self.recent.truncate(RECENT_RUNS_CAPACITY);
    }

    pub(crate) fn note_skipped_firing(&mut self) {
        self.skipped_firings += 1;
    }

    pub(crate) fn mark_started(&mut self, next_run: Option<DateTime<Utc>>) {
        self.running = true;
        self.next_run = next_run;
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.running = false;
        self.next_run = None;
    }

    pub(crate) fn last_run(&self) -> Option<&RunRecord> {
        self.recent.front()
    }

    pub(crate) fn status(&self, run_in_progress: bool) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running,
            interval_minutes: self.interval_minutes,
            next_run: self.next_run,
            last_run_at: self.last_run().map(|r| r.finished_at),
            run_in_progress,
        }
    }

    pub(crate) fn stats(&self) -> SchedulerRunStats {
        SchedulerRunStats {
            total_runs: self.total_runs,
            skipped_firings: self.skipped_firings,
            last_run: self.last_run().cloned(),
            next_run: self.next_run,
            recent_runs: self.recent.iter().cloned().collect(),
        }
    }

    pub(crate) fn total_runs(&self) -> u64 {
        self.total_runs
    }

    pub(crate) fn skipped_firings(&self) -> u64 {
        self.skipped_firings
    }
}
