use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderSn, UserId};

use crate::error::Result;
use crate::order::Order;
use crate::status::{OrderStatus, OrderStatusKind};

/// Persistence for orders.
///
/// The one load-bearing contract is [`OrderStore::update_status`]: every
/// lifecycle transition is a conditional update keyed on the expected
/// prior status kind. A miss means the caller lost a race and must get
/// [`StoreError::UpdateConflict`](crate::StoreError::UpdateConflict)
/// rather than a silent overwrite. This substitutes for row locking: the
/// caller decides whether to retry.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a freshly created order with its lines.
    ///
    /// Fails with `DuplicateOrderSn` when the order number is taken.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads an order by ID. Soft-deleted orders are not returned.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads an order scoped to its owner. Returns `None` both for a
    /// missing order and for somebody else's order, so callers cannot
    /// distinguish the two.
    async fn get_for_user(&self, user_id: UserId, id: OrderId) -> Result<Option<Order>>;

    /// Looks an order up by its order number (payment-callback path).
    async fn get_by_sn(&self, order_sn: &OrderSn) -> Result<Option<Order>>;

    /// Returns true if the order number is already taken, including by
    /// soft-deleted orders.
    async fn sn_exists(&self, order_sn: &OrderSn) -> Result<bool>;

    /// Lists a user's orders, newest first, optionally filtered by
    /// status kind.
    async fn list_for_user(
        &self,
        user_id: UserId,
        statuses: Option<&[OrderStatusKind]>,
    ) -> Result<Vec<Order>>;

    /// Conditionally replaces the status: the write only happens when the
    /// stored kind equals `expected`. Returns the updated order, or
    /// `UpdateConflict` when the guard misses.
    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatusKind,
        status: OrderStatus,
    ) -> Result<Order>;

    /// Soft-deletes an order. Legality (terminal status only) is the
    /// caller's responsibility.
    async fn mark_deleted(&self, id: OrderId) -> Result<()>;

    /// Returns shipped orders whose shipment time is at or before the
    /// cutoff (auto-confirm sweep input).
    async fn shipped_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>>;

    /// Returns still-unpaid orders created at or before the cutoff
    /// (unpaid-timeout sweep input).
    async fn unpaid_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>>;
}
