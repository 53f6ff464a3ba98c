//! # Deposit matcher
//!
//! One call to [`DepositMatcher::run_cycle`] is one reconciliation cycle:
//!
//! 1. Load the unclaimed deposits for the target account and the unlinked pending orders, both bounded by the
//!    eligibility window. If either list is empty the cycle ends immediately.
//! 2. Put the orders into an [`OrderWorkingSet`].
//! 3. Walk the deposits in ascending id order. For each one pick the candidate order with the highest id, then claim
//!    the deposit and link the order in one store transaction. On success the order leaves the working set. If
//!    another actor funded the order in the meantime, nothing is written and the next candidate is tried.
//!
//! Deposits are processed strictly one after another. The working set is only race-free because of that: two deposits
//! handled in parallel could both pick the same order.
//!
//! Matching is greedy. An earlier deposit may take an order that would have suited a later deposit better.
mod errors;
mod report;
pub mod rules;
mod working_set;

use std::{fmt::Display, future::Future};

use chrono::Duration;
pub use errors::MatcherError;
use log::*;
pub use report::CycleReport;
use tokio::time::{timeout_at, Instant};
pub use working_set::OrderWorkingSet;

use crate::{
    db::traits::ReconciliationStore,
    db_types::{ClaimOutcome, Deposit, Order},
    events::{CycleCompletedEvent, DepositLinkedEvent, EventProducers, OrphanedClaimEvent},
};

pub const DEFAULT_MATCH_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Only deposits credited to this account are eligible. `None` (or blank) makes every cycle fail with
    /// [`MatcherError::MissingTargetAccount`].
    pub target_account: Option<String>,
    /// How far back deposits and orders remain eligible.
    pub window: Duration,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self { target_account: None, window: Duration::hours(DEFAULT_MATCH_WINDOW_HOURS) }
    }
}

impl MatchSettings {
    pub fn new<S: Into<String>>(target_account: S) -> Self {
        Self { target_account: Some(target_account.into()), ..Default::default() }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn target_account(&self) -> Result<&str, MatcherError> {
        self.target_account.as_deref().map(str::trim).filter(|a| !a.is_empty()).ok_or(MatcherError::MissingTargetAccount)
    }
}

pub struct DepositMatcher<B> {
    db: B,
    settings: MatchSettings,
    producers: EventProducers,
}

impl<B> std::fmt::Debug for DepositMatcher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DepositMatcher ({:?})", self.settings)
    }
}

impl<B> DepositMatcher<B> {
    pub fn new(db: B, settings: MatchSettings, producers: EventProducers) -> Self {
        Self { db, settings, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }
}

impl<B> DepositMatcher<B>
where B: ReconciliationStore
{
    /// Runs one cycle with no deadline.
    pub async fn run_cycle(&self) -> Result<CycleReport, MatcherError> {
        self.run_cycle_until(None).await
    }

    /// Runs one cycle, giving up cleanly once `deadline` has passed.
    ///
    /// Every store call is raced against the deadline: the bulk reads and each claim-and-link transaction. A pair that
    /// is still in flight when the deadline passes is abandoned, which rolls its transaction back, so the deposit stays
    /// unclaimed. The deadline can therefore only be overrun by the time the runtime takes to notice it, plus the
    /// rollback that SQLite performs when the connection is next used.
    ///
    /// An `Err` means the cycle could not start (configuration or bulk-read failure). Failures on individual deposits
    /// are counted in the returned report and never abort the cycle.
    pub async fn run_cycle_until(&self, deadline: Option<Instant>) -> Result<CycleReport, MatcherError> {
        let account = self.settings.target_account()?;
        let mut report = CycleReport::default();

        let deposits = load(deadline, self.db.fetch_unclaimed_deposits(account, self.settings.window)).await?;
        if deposits.is_empty() {
            debug!("🔗️ No unclaimed deposits for account {account}. Nothing to do.");
            self.call_cycle_completed_hook(report).await;
            return Ok(report);
        }
        let orders = load(deadline, self.db.fetch_unlinked_orders(self.settings.window)).await?;
        if orders.is_empty() {
            debug!("🔗️ {} unclaimed deposits but no unlinked orders. Nothing to do.", deposits.len());
            self.call_cycle_completed_hook(report).await;
            return Ok(report);
        }
        let mut working_set = OrderWorkingSet::new(orders);
        debug!("🔗️ Matching {} deposits against {} orders", deposits.len(), working_set.len());

        'deposits: for mut deposit in deposits {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("🔗️ Cycle deadline reached after {} deposits. The rest wait for the next cycle.", report.deposits_scanned);
                report.timed_out = true;
                break;
            }
            report.deposits_scanned += 1;
            loop {
                let Some(winner) = working_set.best_candidate(&deposit).cloned() else {
                    trace!("🔗️ Deposit #{} ({}) has no candidate order", deposit.id, deposit.amount);
                    report.unmatched += 1;
                    break;
                };
                report.matches_attempted += 1;
                let Some(outcome) = within(deadline, self.db.claim_and_link(deposit.id, winner.id)).await else {
                    warn!(
                        "🔗️ Cycle deadline reached while linking deposit #{} to order #{}. The attempt was rolled back.",
                        deposit.id, winner.id
                    );
                    report.timed_out = true;
                    break 'deposits;
                };
                match outcome {
                    Ok(ClaimOutcome::Linked) => {
                        working_set.remove(winner.id);
                        deposit.claimed = true;
                        info!("🔗️ Deposit #{} ({}) funds order #{}", deposit.id, deposit.amount, winner.id);
                        report.matches_committed += 1;
                        report.amount_linked += deposit.amount;
                        self.call_deposit_linked_hook(deposit.clone(), winner).await;
                    },
                    Ok(ClaimOutcome::DepositTaken) => {
                        debug!("🔗️ Deposit #{} was claimed by another actor. Skipping it.", deposit.id);
                        report.claim_conflicts += 1;
                    },
                    Ok(ClaimOutcome::OrderUnavailable) => {
                        // Another actor funded this order since it was loaded. The deposit is untouched, so it may
                        // still fund the next candidate.
                        debug!("🔗️ Order #{} was linked by another actor. Trying the next candidate.", winner.id);
                        report.order_conflicts += 1;
                        working_set.remove(winner.id);
                        continue;
                    },
                    Ok(ClaimOutcome::Orphaned(reason)) => {
                        working_set.remove(winner.id);
                        deposit.claimed = true;
                        error!(
                            "🚨️ INTEGRITY: deposit #{} ({}) was claimed but could not be linked to order #{}: \
                             {reason}. The deposit is consumed and funds nothing. It will not be retried and must be \
                             reconciled by hand.",
                            deposit.id, deposit.amount, winner.id
                        );
                        report.orphaned_claims += 1;
                        self.call_orphaned_claim_hook(deposit.clone(), winner, reason).await;
                    },
                    Err(e) => {
                        warn!(
                            "🔗️ Could not claim deposit #{}: {e}. Nothing was committed and it stays available for \
                             the next cycle.",
                            deposit.id
                        );
                        report.failed_claims += 1;
                    },
                }
                break;
            }
        }
        info!("🔗️ Cycle complete. {report}");
        self.call_cycle_completed_hook(report).await;
        Ok(report)
    }

    async fn call_deposit_linked_hook(&self, deposit: Deposit, order: Order) {
        for emitter in &self.producers.deposit_linked_producer {
            emitter.publish_event(DepositLinkedEvent::new(deposit.clone(), order.clone())).await;
        }
    }

    async fn call_orphaned_claim_hook(&self, deposit: Deposit, order: Order, reason: String) {
        for emitter in &self.producers.orphaned_claim_producer {
            emitter.publish_event(OrphanedClaimEvent::new(deposit.clone(), order.clone(), reason.clone())).await;
        }
    }

    async fn call_cycle_completed_hook(&self, report: CycleReport) {
        for emitter in &self.producers.cycle_completed_producer {
            emitter.publish_event(CycleCompletedEvent::new(report)).await;
        }
    }
}

/// `None` if `deadline` passed before `fut` completed.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

async fn load<T, E, F>(deadline: Option<Instant>, fut: F) -> Result<T, MatcherError>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    within(deadline, fut)
        .await
        .ok_or(MatcherError::Timeout)?
        .map_err(|e| MatcherError::DatabaseError(e.to_string()))
}
