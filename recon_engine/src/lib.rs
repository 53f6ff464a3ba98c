//! Deposit Reconciliation Engine
//!
//! Pairs inbound bank deposits with pending payment orders, and guarantees that a deposit funds at most one order even
//! when several matcher runs overlap or race.
//!
//! The library is divided into three sections:
//! 1. The store. [`ReconciliationStore`] is the narrow contract the matcher runs on; its
//!    [`ReconciliationStore::try_claim_deposit`] conditional update is the only cross-actor concurrency primitive in
//!    the system. [`LedgerManagement`] covers inserts and lookups for the ingestion jobs and operators. SQLite is the
//!    supported backend.
//! 2. The matcher ([`mod@matcher`]). [`DepositMatcher`] runs one reconciliation cycle at a time and reports what it did
//!    in a [`CycleReport`].
//! 3. Events ([`mod@events`]). Linked deposits, orphaned claims and completed cycles are published to optional async
//!    hooks, which is how alerting sinks attach to the engine.
//!
//! Scheduling and overlap protection live in the server crate.
mod db;

pub mod db_types;
pub mod events;
pub mod matcher;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{LedgerManagement, ReconciliationStore};
pub use matcher::{CycleReport, DepositMatcher, MatchSettings, MatcherError};
