use chrono::Duration;

use crate::db_types::{ClaimOutcome, Deposit, Order};

/// The primitives the matcher runs on.
///
/// Correctness across actors rests entirely on the conditional claim, made either on its own by
/// [`ReconciliationStore::try_claim_deposit`] or as the first write of [`ReconciliationStore::claim_and_link`]. Any
/// number of matcher instances, in this process or others, may race for the same deposit; the conditional update
/// guarantees that at most one of them observes success.
#[allow(async_fn_in_trait)]
pub trait ReconciliationStore {
    type Error: std::error::Error;

    /// All deposits with `claimed = 0`, credited to `account_id`, with a transaction date no older than `window`.
    ///
    /// Rows are returned in ascending id order.
    async fn fetch_unclaimed_deposits(&self, account_id: &str, window: Duration) -> Result<Vec<Deposit>, Self::Error>;

    /// All pending orders without a deposit reference, created no earlier than `window` ago.
    async fn fetch_unlinked_orders(&self, window: Duration) -> Result<Vec<Order>, Self::Error>;

    /// Sets `claimed = 1` on the deposit only if it is currently unclaimed, in a single statement.
    ///
    /// Returns `true` if this call performed the claim, and `false` if the deposit was already claimed (or does not
    /// exist). A `false` result is a routine outcome, not an error.
    async fn try_claim_deposit(&self, deposit_id: i64) -> Result<bool, Self::Error>;

    /// Records `deposit_id` as the funding deposit of `order_id`.
    ///
    /// Must only be called after this caller won the claim on `deposit_id`. Fails if the order is already linked or
    /// the deposit is not claimed.
    async fn link_order(&self, order_id: i64, deposit_id: i64) -> Result<(), Self::Error>;

    /// Claims `deposit_id` and links it to `order_id` inside a single transaction.
    ///
    /// Either both writes are committed or neither is. Losing the deposit to another actor gives
    /// [`ClaimOutcome::DepositTaken`], and finding the order already linked gives
    /// [`ClaimOutcome::OrderUnavailable`]; in both cases the transaction is rolled back. An `Err` means nothing was
    /// committed. Dropping the returned future before it completes also rolls the transaction back.
    async fn claim_and_link(&self, deposit_id: i64, order_id: i64) -> Result<ClaimOutcome, Self::Error>;
}
