use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Deposit, Order},
    matcher::CycleReport,
};

/// A deposit was claimed and the winning order now references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositLinkedEvent {
    pub deposit: Deposit,
    pub order: Order,
}

impl DepositLinkedEvent {
    pub fn new(deposit: Deposit, order: Order) -> Self {
        Self { deposit, order }
    }
}

/// The deposit was claimed, but linking it to `order` failed. The deposit is now consumed and funds nothing until an
/// operator reconciles it by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedClaimEvent {
    pub deposit: Deposit,
    pub order: Order,
    pub reason: String,
}

impl OrphanedClaimEvent {
    pub fn new<S: Into<String>>(deposit: Deposit, order: Order, reason: S) -> Self {
        Self { deposit, order, reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCompletedEvent {
    pub report: CycleReport,
}

impl CycleCompletedEvent {
    pub fn new(report: CycleReport) -> Self {
        Self { report }
    }
}
