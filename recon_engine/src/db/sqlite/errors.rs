use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Order #{0} is already linked to a deposit")]
    OrderAlreadyLinked(i64),
    #[error("Deposit #{0} has not been claimed, so it cannot be linked to an order")]
    DepositNotClaimed(i64),
}
