use crate::db_types::{Deposit, NewDeposit, NewOrder, Order};

/// Row-level access used by the ingestion collaborators, operators and tests.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    type Error: std::error::Error;

    /// Stores a deposit delivered by an ingestion job and returns its id. The sender name is stored normalized.
    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<i64, Self::Error>;

    /// Stores an order delivered by the intake process and returns its id.
    async fn insert_order(&self, order: NewOrder) -> Result<i64, Self::Error>;

    async fn fetch_deposit(&self, deposit_id: i64) -> Result<Option<Deposit>, Self::Error>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, Self::Error>;

    /// The order funded by the given deposit, if any.
    async fn fetch_order_for_deposit(&self, deposit_id: i64) -> Result<Option<Order>, Self::Error>;

    /// Claimed deposits that no order references. Each of these is the trace of a link that failed after a
    /// successful claim, and needs a human to reconcile it.
    async fn fetch_orphaned_claims(&self) -> Result<Vec<Deposit>, Self::Error>;
}
