//! Checkout error types.

use domain::OrderServiceError;
use order_store::{StockError, StoreError};
use thiserror::Error;

/// Errors that can occur while submitting a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No checked items to order.
    #[error("nothing to check out")]
    EmptyCart,

    /// The shipping address does not exist or belongs to another user.
    #[error("invalid shipping address: {0}")]
    BadAddress(String),

    /// The coupon does not exist, is expired, or does not apply to this
    /// cart.
    #[error("invalid coupon: {0}")]
    InvalidCoupon(String),

    /// The group-buy rules do not exist or are no longer open.
    #[error("invalid groupon rules: {0}")]
    InvalidGroupon(String),

    /// Address book lookup failed.
    #[error("address service error: {0}")]
    AddressService(String),

    /// Cart read or clear failed.
    #[error("cart service error: {0}")]
    CartService(String),

    /// Coupon or groupon validation failed for a non-business reason.
    #[error("promotion service error: {0}")]
    PromotionService(String),

    /// Scheduling the unpaid-timeout cancel failed.
    #[error("scheduler error: {0}")]
    SchedulerService(String),

    /// Stock deduction failed; any already-deducted lines have been
    /// restored.
    #[error("stock error: {0}")]
    Stock(#[from] StockError),

    /// Order persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Lifecycle-level failure (order-number exhaustion and friends).
    #[error(transparent)]
    Lifecycle(#[from] OrderServiceError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
