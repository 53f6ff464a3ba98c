use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::*;
use recon_engine::{db_types::Cents, CycleReport, DepositMatcher, LedgerManagement, MatcherError, SqliteDatabase};
use serde::Serialize;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::single_flight::SingleFlight;

/// Running totals of the linker, served by `/status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkerStatus {
    pub running: bool,
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    /// Ticks dropped because the previous cycle was still in progress.
    pub ticks_skipped: u64,
    pub links_committed: u64,
    pub amount_linked: Cents,
    pub orphaned_claims: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_report: Option<CycleReport>,
    pub last_error: Option<String>,
}

pub struct LinkerWorker {
    matcher: DepositMatcher<SqliteDatabase>,
    guard: SingleFlight,
    status: Arc<Mutex<LinkerStatus>>,
    cycle_timeout: Duration,
}

impl LinkerWorker {
    pub fn new(matcher: DepositMatcher<SqliteDatabase>, cycle_timeout: Duration) -> Self {
        Self { matcher, guard: SingleFlight::new(), status: Arc::new(Mutex::new(LinkerStatus::default())), cycle_timeout }
    }

    pub fn status(&self) -> Arc<Mutex<LinkerStatus>> {
        Arc::clone(&self.status)
    }

    pub fn snapshot(&self) -> LinkerStatus {
        self.status.lock().map(|s| s.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Runs one cycle unless one is already in flight, in which case the tick is dropped and `None` is returned.
    pub async fn tick(&self) -> Option<Result<CycleReport, MatcherError>> {
        let result = self.guard.run(self.run_cycle()).await;
        if result.is_none() {
            info!("🕰️ The previous linker cycle is still running. Skipping this tick.");
            self.update(|s| s.ticks_skipped += 1);
        }
        result
    }

    async fn run_cycle(&self) -> Result<CycleReport, MatcherError> {
        let _running = RunningMark::set(Arc::clone(&self.status));
        self.update(|s| {
            s.cycles_started += 1;
            s.last_started_at = Some(Utc::now());
        });
        let deadline = Instant::now() + self.cycle_timeout;
        let result = self.matcher.run_cycle_until(Some(deadline)).await;
        match &result {
            Ok(report) => {
                if report.timed_out {
                    warn!("🕰️ Linker cycle ran out of time after {:?}. {report}", self.cycle_timeout);
                }
            },
            Err(MatcherError::MissingTargetAccount) => {
                error!("🕰️ RECON_TARGET_ACCOUNT is not configured. Skipping this linker cycle.");
            },
            Err(e) => error!("🕰️ Linker cycle aborted. {e}"),
        }
        self.update(|s| {
            s.last_finished_at = Some(Utc::now());
            match &result {
                Ok(report) => {
                    s.cycles_completed += 1;
                    s.links_committed += report.matches_committed as u64;
                    s.amount_linked += report.amount_linked;
                    s.orphaned_claims += report.orphaned_claims as u64;
                    s.last_report = Some(*report);
                    s.last_error = None;
                },
                Err(e) => {
                    s.cycles_failed += 1;
                    s.last_error = Some(e.to_string());
                },
            }
        });
        result
    }

    /// Logs deposits that were claimed in an earlier run but never linked. They are not retried.
    pub async fn report_orphaned_claims(&self) {
        match self.matcher.db().fetch_orphaned_claims().await {
            Ok(orphans) if orphans.is_empty() => debug!("🕰️ No orphaned claims in the store"),
            Ok(orphans) => {
                let ids = orphans.iter().map(|d| format!("#{} ({})", d.id, d.amount)).collect::<Vec<_>>().join(", ");
                error!(
                    "🚨️ INTEGRITY: {} deposits are claimed but fund no order and need manual reconciliation: {ids}",
                    orphans.len()
                );
            },
            Err(e) => warn!("🕰️ Could not check the store for orphaned claims. {e}"),
        }
    }

    fn update<F: FnOnce(&mut LinkerStatus)>(&self, f: F) {
        update_status(&self.status, f)
    }
}

fn update_status<F: FnOnce(&mut LinkerStatus)>(status: &Mutex<LinkerStatus>, f: F) {
    match status.lock() {
        Ok(mut status) => f(&mut status),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}

/// Shows the linker as running for as long as it is alive. Cleared on drop, so a cycle that panics or is cancelled
/// is never reported as still running.
struct RunningMark {
    status: Arc<Mutex<LinkerStatus>>,
}

impl RunningMark {
    fn set(status: Arc<Mutex<LinkerStatus>>) -> Self {
        update_status(&status, |s| s.running = true);
        Self { status }
    }
}

impl Drop for RunningMark {
    fn drop(&mut self) {
        update_status(&self.status, |s| s.running = false);
    }
}

/// Starts the linker worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The first cycle starts immediately. Each tick spawns its cycle, so the timer keeps running while a slow cycle is in
/// flight; such overlapping ticks are dropped by the worker's guard. Ticks missed while the runtime was busy are
/// skipped, not replayed.
pub fn start_linker_worker(worker: Arc<LinkerWorker>, poll_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("🕰️ Linker worker started. Cycles run every {poll_interval:?}");
        worker.report_orphaned_claims().await;
        loop {
            timer.tick().await;
            let worker = Arc::clone(&worker);
            tokio::spawn(async move {
                trace!("🕰️ Linker tick");
                worker.tick().await;
            });
        }
    })
}
