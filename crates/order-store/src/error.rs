use thiserror::Error;

use common::{OrderId, OrderSn};

use crate::status::OrderStatusKind;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A status-guarded update matched zero rows because the stored
    /// status no longer equals the expected one. The race loser must
    /// surface this; the store never overwrites a concurrent change.
    #[error(
        "update conflict for order {order_id}: expected status {expected}, found {actual}"
    )]
    UpdateConflict {
        order_id: OrderId,
        expected: OrderStatusKind,
        actual: OrderStatusKind,
    },

    /// The order was not found (or is soft-deleted).
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// An order with the same order number already exists.
    #[error("duplicate order number: {0}")]
    DuplicateOrderSn(OrderSn),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
