//! Lifecycle error types.

use common::{Money, OrderId, OrderSn};
use order_store::{OrderStatusKind, StoreError};
use thiserror::Error;

/// Errors that can occur during order lifecycle operations.
///
/// Everything here is a local, recoverable condition scoped to the one
/// requested operation; the core itself never retries (except the
/// bounded order-number collision loop).
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// The order does not exist or belongs to another user.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// A payment callback referenced an unknown order number.
    #[error("no order with number {0}")]
    UnknownOrderNumber(OrderSn),

    /// The status precondition for the operation is unmet.
    #[error("cannot {action} an order in status {current}")]
    InvalidTransition {
        current: OrderStatusKind,
        action: &'static str,
    },

    /// The optimistic-lock guard missed: a concurrent transition won.
    /// The caller decides whether to reload and retry.
    #[error("update conflict for order {order_id}: expected status {expected}, found {actual}")]
    UpdateConflict {
        order_id: OrderId,
        expected: OrderStatusKind,
        actual: OrderStatusKind,
    },

    /// The gateway-notified amount disagrees with the stored total.
    /// Compared as exact fixed-point cents, never approximately.
    #[error(
        "payment amount mismatch for order {order_sn}: notified {notified}, expected {expected}"
    )]
    AmountMismatch {
        order_sn: OrderSn,
        expected: Money,
        notified: Money,
    },

    /// Order-number generation kept colliding; fatal for this checkout
    /// attempt only.
    #[error("order number generation exhausted after {attempts} attempts")]
    OrderSnExhausted { attempts: u32 },

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for OrderServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UpdateConflict {
                order_id,
                expected,
                actual,
            } => OrderServiceError::UpdateConflict {
                order_id,
                expected,
                actual,
            },
            StoreError::NotFound(id) => OrderServiceError::NotFound(id),
            other => OrderServiceError::Store(other),
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, OrderServiceError>;
