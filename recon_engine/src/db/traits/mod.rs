//! # Store interfaces
//!
//! This module defines the contracts a database backend must satisfy to serve the reconciliation engine.
//!
//! * [`ReconciliationStore`] exposes exactly the primitives the matcher needs: the two bulk candidate reads, the
//!   atomic deposit claim and the order link. It carries no business logic.
//! * [`LedgerManagement`] covers everything around the matcher: inserting rows on behalf of the ingestion jobs,
//!   fetching single rows, and listing orphaned claims for manual reconciliation.
mod ledger_management;
mod reconciliation_store;

pub use ledger_management::LedgerManagement;
pub use reconciliation_store::ReconciliationStore;
