use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Deposit, NewDeposit},
};

const DEPOSIT_COLUMNS: &str =
    "id, amount, sender_name_normalized, sender_document, account_id, claimed, transaction_date";

/// Inserts a new deposit using the given connection and returns its id. The sender name is normalized on the way in
/// so that the matcher never has to re-normalize stored names.
pub async fn insert_deposit(deposit: NewDeposit, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            INSERT INTO deposits (
                amount,
                sender_name_normalized,
                sender_document,
                account_id,
                transaction_date
            ) VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(deposit.amount)
    .bind(deposit.normalized_sender_name())
    .bind(deposit.document())
    .bind(&deposit.account_id)
    .bind(deposit.transaction_date)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_deposit(id: i64, conn: &mut SqliteConnection) -> Result<Option<Deposit>, SqliteDatabaseError> {
    let deposit = sqlx::query_as::<_, Deposit>(&format!("SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(deposit)
}

/// Unclaimed deposits credited to `account_id` since `since`, in ascending id order.
///
/// Timestamps are compared through `julianday` so that rows written with SQLite's `CURRENT_TIMESTAMP` format and rows
/// written as RFC 3339 compare correctly.
pub async fn fetch_unclaimed_deposits(
    account_id: &str,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Deposit>, SqliteDatabaseError> {
    let sql = format!(
        r#"
        SELECT {DEPOSIT_COLUMNS} FROM deposits
        WHERE claimed = 0
          AND account_id = $1
          AND julianday(transaction_date) >= julianday($2)
        ORDER BY id ASC
        "#
    );
    trace!("🗃️ Executing query: {sql}");
    let deposits = sqlx::query_as::<_, Deposit>(&sql).bind(account_id).bind(since).fetch_all(conn).await?;
    trace!("🗃️ {} unclaimed deposits for account {account_id}", deposits.len());
    Ok(deposits)
}

/// The compare-and-set at the heart of the engine: `claimed` flips from 0 to 1 only for the one statement that sees it
/// at 0. Returns true iff this call flipped it.
pub async fn try_claim_deposit(id: i64, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE deposits SET claimed = 1 WHERE id = $1 AND claimed = 0").bind(id).execute(conn).await?;
    trace!("🗃️ Claim on deposit #{id} affected {} rows", result.rows_affected());
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_orphaned_claims(conn: &mut SqliteConnection) -> Result<Vec<Deposit>, SqliteDatabaseError> {
    let sql = format!(
        r#"
        SELECT {DEPOSIT_COLUMNS} FROM deposits d
        WHERE d.claimed = 1
          AND NOT EXISTS (SELECT 1 FROM orders o WHERE o.deposit_id = d.id)
        ORDER BY d.id ASC
        "#
    );
    let deposits = sqlx::query_as::<_, Deposit>(&sql).fetch_all(conn).await?;
    Ok(deposits)
}
