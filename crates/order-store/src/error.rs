use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order to update or delete does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back to the order model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
