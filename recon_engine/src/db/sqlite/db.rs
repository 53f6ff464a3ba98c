use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{db_url, deposits, new_pool, orders, SqliteDatabaseError};
use crate::{
    db::traits::{LedgerManagement, ReconciliationStore},
    db_types::{ClaimOutcome, Deposit, NewDeposit, NewOrder, Order},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `RECON_DATABASE_URL`, or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date with the migrations embedded in this crate.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl ReconciliationStore for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_unclaimed_deposits(&self, account_id: &str, window: Duration) -> Result<Vec<Deposit>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        deposits::fetch_unclaimed_deposits(account_id, Utc::now() - window, &mut conn).await
    }

    async fn fetch_unlinked_orders(&self, window: Duration) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_unlinked_orders(Utc::now() - window, &mut conn).await
    }

    /// Runs as a single auto-committed statement, so the claim is visible to every other actor the moment it succeeds.
    /// The matcher does not use it on its own; see `claim_and_link`.
    async fn try_claim_deposit(&self, deposit_id: i64) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        deposits::try_claim_deposit(deposit_id, &mut conn).await
    }

    /// The link gets its own short transaction. The matcher uses `claim_and_link` instead.
    async fn link_order(&self, order_id: i64, deposit_id: i64) -> Result<(), Self::Error> {
        let mut tx = self.pool.begin().await?;
        orders::link_order(order_id, deposit_id, &mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// `BEGIN` is deferred, but the first statement is the claim's `UPDATE`, so the write lock is taken up front and a
    /// competing writer waits on the busy timeout rather than failing an upgrade.
    async fn claim_and_link(&self, deposit_id: i64, order_id: i64) -> Result<ClaimOutcome, Self::Error> {
        let mut tx = self.pool.begin().await?;
        if !deposits::try_claim_deposit(deposit_id, &mut *tx).await? {
            tx.rollback().await?;
            return Ok(ClaimOutcome::DepositTaken);
        }
        let linked = orders::link_order(order_id, deposit_id, &mut *tx).await;
        match linked {
            Ok(()) => {},
            Err(SqliteDatabaseError::OrderAlreadyLinked(_)) | Err(SqliteDatabaseError::OrderNotFound(_)) => {
                debug!("🗃️ Order #{order_id} is no longer available. Releasing deposit #{deposit_id}");
                tx.rollback().await?;
                return Ok(ClaimOutcome::OrderUnavailable);
            },
            // Dropping the transaction rolls it back.
            Err(e) => return Err(e),
        }
        match tx.commit().await {
            Ok(()) => Ok(ClaimOutcome::Linked),
            Err(e) => self.diagnose_failed_commit(deposit_id, order_id, e).await,
        }
    }
}

impl SqliteDatabase {
    /// A failed `COMMIT` leaves the outcome open, so look at what actually landed.
    async fn diagnose_failed_commit(
        &self,
        deposit_id: i64,
        order_id: i64,
        error: sqlx::Error,
    ) -> Result<ClaimOutcome, SqliteDatabaseError> {
        warn!("🗃️ Commit of claim #{deposit_id} -> order #{order_id} failed: {error}. Checking the stored state.");
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return Ok(ClaimOutcome::Orphaned(format!("{error}; state could not be checked: {e}"))),
        };
        let deposit = deposits::fetch_deposit(deposit_id, &mut conn).await;
        let order = orders::fetch_order_for_deposit(deposit_id, &mut conn).await;
        match (deposit, order) {
            (Ok(Some(d)), Ok(Some(o))) if d.claimed && o.id == order_id => Ok(ClaimOutcome::Linked),
            (Ok(Some(d)), Ok(None)) if d.claimed => Ok(ClaimOutcome::Orphaned(error.to_string())),
            (Ok(_), Ok(_)) => Err(error.into()),
            (Err(e), _) | (_, Err(e)) => Ok(ClaimOutcome::Orphaned(format!("{error}; state could not be checked: {e}"))),
        }
    }
}

impl LedgerManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let id = deposits::insert_deposit(deposit, &mut conn).await?;
        debug!("🗃️ Deposit #{id} has been saved in the DB");
        Ok(id)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let id = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order #{id} has been saved in the DB");
        Ok(id)
    }

    async fn fetch_deposit(&self, deposit_id: i64) -> Result<Option<Deposit>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        deposits::fetch_deposit(deposit_id, &mut conn).await
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_for_deposit(&self, deposit_id: i64) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_for_deposit(deposit_id, &mut conn).await
    }

    async fn fetch_orphaned_claims(&self) -> Result<Vec<Deposit>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        deposits::fetch_orphaned_claims(&mut conn).await
    }
}
