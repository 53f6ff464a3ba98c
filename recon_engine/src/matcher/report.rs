use std::fmt::Display;

use recon_common::Cents;
use serde::{Deserialize, Serialize};

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Deposits the cycle looked at.
    pub deposits_scanned: usize,
    /// Claim-and-link transactions attempted. A deposit may need more than one if its first choice was taken.
    pub matches_attempted: usize,
    /// Deposits that were claimed and linked to an order.
    pub matches_committed: usize,
    /// Deposits already claimed by another actor. Routine, not an error.
    pub claim_conflicts: usize,
    /// Orders linked by another actor after they were loaded. Routine; the deposit tries its next candidate.
    pub order_conflicts: usize,
    /// Attempts that failed with a store error. Nothing was written and the deposit stays available.
    pub failed_claims: usize,
    /// Commits whose outcome left the deposit claimed and unlinked. Each one needs manual reconciliation.
    pub orphaned_claims: usize,
    /// Deposits left without a candidate order this cycle.
    pub unmatched: usize,
    /// Sum of the committed deposits.
    pub amount_linked: Cents,
    /// The cycle deadline passed before every deposit was scanned.
    pub timed_out: bool,
}

impl CycleReport {
    pub fn has_integrity_failures(&self) -> bool {
        self.orphaned_claims > 0
    }
}

impl Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned: {}, attempted: {}, committed: {} ({}), deposit conflicts: {}, order conflicts: {}, failed claims: \
             {}, orphaned: {}, unmatched: {}",
            self.deposits_scanned,
            self.matches_attempted,
            self.matches_committed,
            self.amount_linked,
            self.claim_conflicts,
            self.order_conflicts,
            self.failed_claims,
            self.orphaned_claims,
            self.unmatched
        )?;
        if self.timed_out {
            write!(f, " (timed out)")?;
        }
        Ok(())
    }
}
