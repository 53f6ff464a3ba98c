use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewOrder, Order, OrderStatusType},
};

const ORDER_COLUMNS: &str = "id, amount, payer_name, payer_document, deposit_id, status, created_at";

/// Inserts a new order using the given connection and returns its id. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            INSERT INTO orders (
                amount,
                payer_name,
                payer_document,
                status,
                created_at
            ) VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(order.amount)
    .bind(order.payer_name.trim())
    .bind(order.document())
    .bind(order.status)
    .bind(order.created_at)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_for_deposit(
    deposit_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE deposit_id = $1"))
        .bind(deposit_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Pending orders with no funding deposit, created since `since`, in ascending id order.
pub async fn fetch_unlinked_orders(
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let sql = format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
        WHERE deposit_id IS NULL
          AND status = $1
          AND julianday(created_at) >= julianday($2)
        ORDER BY id ASC
        "#
    );
    trace!("🗃️ Executing query: {sql}");
    let orders =
        sqlx::query_as::<_, Order>(&sql).bind(OrderStatusType::Pending).bind(since).fetch_all(conn).await?;
    trace!("🗃️ {} unlinked orders", orders.len());
    Ok(orders)
}

/// Sets the funding deposit of an order.
///
/// The update only applies while the order is unlinked and the deposit is claimed. When no row is affected the reason
/// is looked up so that the caller gets a precise error. Run this inside a transaction (`&mut *tx`) so that the update
/// and the diagnosis see the same snapshot.
pub async fn link_order(order_id: i64, deposit_id: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET deposit_id = $1
        WHERE id = $2
          AND deposit_id IS NULL
          AND EXISTS (SELECT 1 FROM deposits WHERE id = $1 AND claimed = 1)
        "#,
    )
    .bind(deposit_id)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 1 {
        trace!("🗃️ Order #{order_id} linked to deposit #{deposit_id}");
        return Ok(());
    }
    match fetch_order(order_id, &mut *conn).await? {
        None => Err(SqliteDatabaseError::OrderNotFound(order_id)),
        Some(order) if order.deposit_id.is_some() => Err(SqliteDatabaseError::OrderAlreadyLinked(order_id)),
        Some(_) => Err(SqliteDatabaseError::DepositNotClaimed(deposit_id)),
    }
}
