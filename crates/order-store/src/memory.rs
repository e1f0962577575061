use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderSn, UserId};
use tokio::sync::RwLock;

use crate::{
    Order, OrderStatus, OrderStatusKind, Result, StoreError,
    store::OrderStore,
};

/// In-memory order store implementation for testing.
///
/// Provides the same conditional-update semantics as the PostgreSQL
/// implementation: the status swap happens under one write lock, so two
/// racing transitions observe exactly one winner.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl MemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored, soft-deleted included.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.values().any(|o| o.order_sn == order.order_sn) {
            return Err(StoreError::DuplicateOrderSn(order.order_sn.clone()));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).filter(|o| !o.deleted).cloned())
    }

    async fn get_for_user(&self, user_id: UserId, id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .get(&id)
            .filter(|o| !o.deleted && o.user_id == user_id)
            .cloned())
    }

    async fn get_by_sn(&self, order_sn: &OrderSn) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| !o.deleted && &o.order_sn == order_sn)
            .cloned())
    }

    async fn sn_exists(&self, order_sn: &OrderSn) -> Result<bool> {
        let orders = self.orders.read().await;
        Ok(orders.values().any(|o| &o.order_sn == order_sn))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        statuses: Option<&[OrderStatusKind]>,
    ) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| !o.deleted && o.user_id == user_id)
            .filter(|o| match statuses {
                Some(kinds) => kinds.contains(&o.status_kind()),
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatusKind,
        status: OrderStatus,
    ) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .filter(|o| !o.deleted)
            .ok_or(StoreError::NotFound(id))?;

        let actual = order.status_kind();
        if actual != expected {
            return Err(StoreError::UpdateConflict {
                order_id: id,
                expected,
                actual,
            });
        }

        order.status = status;
        Ok(order.clone())
    }

    async fn mark_deleted(&self, id: OrderId) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .filter(|o| !o.deleted)
            .ok_or(StoreError::NotFound(id))?;
        order.deleted = true;
        Ok(())
    }

    async fn shipped_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| !o.deleted)
            .filter(|o| {
                o.status.shipment().is_some_and(|s| {
                    o.status_kind() == OrderStatusKind::Shipped && s.shipped_at <= cutoff
                })
            })
            .cloned()
            .collect())
    }

    async fn unpaid_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| {
                !o.deleted && o.status_kind() == OrderStatusKind::Created && o.created_at <= cutoff
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PaymentRecord;
    use crate::{OrderLine, OrderPricing};
    use common::Money;

    fn sample_order(user_id: UserId, sn: &str) -> Order {
        Order::create(
            OrderId::new(),
            user_id,
            OrderSn::new(sn),
            "Zhang San",
            "13800000000",
            "1 Example Road",
            "",
            OrderPricing::new(
                Money::from_cents(2_000),
                Money::from_cents(600),
                Money::zero(),
                Money::zero(),
            ),
            vec![OrderLine::new(
                "SKU-001",
                "Widget",
                "",
                vec![],
                2,
                Money::from_cents(1_000),
            )],
            Utc::now(),
        )
    }

    fn paid_status() -> OrderStatus {
        OrderStatus::Paid {
            payment: PaymentRecord {
                transaction_id: "TX-001".to_string(),
                paid_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = MemoryOrderStore::new();
        let user = UserId::new();
        let order = sample_order(user, "SN-1");
        store.insert(&order).await.unwrap();

        let loaded = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(loaded, order);
        assert!(store.get(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_sn_rejected() {
        let store = MemoryOrderStore::new();
        let user = UserId::new();
        store.insert(&sample_order(user, "SN-1")).await.unwrap();

        let result = store.insert(&sample_order(user, "SN-1")).await;
        assert!(matches!(result, Err(StoreError::DuplicateOrderSn(_))));
    }

    #[tokio::test]
    async fn get_for_user_hides_other_owners() {
        let store = MemoryOrderStore::new();
        let owner = UserId::new();
        let order = sample_order(owner, "SN-1");
        store.insert(&order).await.unwrap();

        assert!(store.get_for_user(owner, order.id).await.unwrap().is_some());
        assert!(
            store
                .get_for_user(UserId::new(), order.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_status_swaps_when_guard_matches() {
        let store = MemoryOrderStore::new();
        let order = sample_order(UserId::new(), "SN-1");
        store.insert(&order).await.unwrap();

        let updated = store
            .update_status(order.id, OrderStatusKind::Created, paid_status())
            .await
            .unwrap();
        assert_eq!(updated.status_kind(), OrderStatusKind::Paid);
    }

    #[tokio::test]
    async fn update_status_conflict_when_guard_misses() {
        let store = MemoryOrderStore::new();
        let order = sample_order(UserId::new(), "SN-1");
        store.insert(&order).await.unwrap();

        // Win the race first.
        store
            .update_status(order.id, OrderStatusKind::Created, paid_status())
            .await
            .unwrap();

        // The stale second attempt must lose, and the stored status must
        // remain the winner's.
        let result = store
            .update_status(order.id, OrderStatusKind::Created, paid_status())
            .await;
        assert!(matches!(
            result,
            Err(StoreError::UpdateConflict {
                expected: OrderStatusKind::Created,
                actual: OrderStatusKind::Paid,
                ..
            })
        ));
        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status_kind(), OrderStatusKind::Paid);
    }

    #[tokio::test]
    async fn concurrent_transitions_have_exactly_one_winner() {
        let store = MemoryOrderStore::new();
        let order = sample_order(UserId::new(), "SN-1");
        store.insert(&order).await.unwrap();

        let a = store.update_status(order.id, OrderStatusKind::Created, paid_status());
        let b = store.update_status(
            order.id,
            OrderStatusKind::Created,
            OrderStatus::Cancelled {
                cancelled_at: Utc::now(),
            },
        );
        let (ra, rb) = tokio::join!(a, b);

        let winners = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = if ra.is_ok() { rb } else { ra };
        assert!(matches!(loser, Err(StoreError::UpdateConflict { .. })));
    }

    #[tokio::test]
    async fn mark_deleted_hides_order() {
        let store = MemoryOrderStore::new();
        let user = UserId::new();
        let order = sample_order(user, "SN-1");
        store.insert(&order).await.unwrap();

        store.mark_deleted(order.id).await.unwrap();
        assert!(store.get(order.id).await.unwrap().is_none());
        assert!(store.list_for_user(user, None).await.unwrap().is_empty());
        // The order number stays reserved.
        assert!(store.sn_exists(&OrderSn::new("SN-1")).await.unwrap());
        // Double delete is NotFound.
        assert!(matches!(
            store.mark_deleted(order.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_for_user_filters_by_status() {
        let store = MemoryOrderStore::new();
        let user = UserId::new();
        let first = sample_order(user, "SN-1");
        let second = sample_order(user, "SN-2");
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();
        store
            .update_status(second.id, OrderStatusKind::Created, paid_status())
            .await
            .unwrap();

        let created = store
            .list_for_user(user, Some(&[OrderStatusKind::Created]))
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, first.id);

        let all = store.list_for_user(user, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn sweeps_pick_only_matching_orders() {
        let store = MemoryOrderStore::new();
        let user = UserId::new();
        let now = Utc::now();

        let mut stale_unpaid = sample_order(user, "SN-1");
        stale_unpaid.created_at = now - chrono::Duration::hours(1);
        let mut fresh_unpaid = sample_order(user, "SN-2");
        fresh_unpaid.created_at = now + chrono::Duration::hours(1);
        store.insert(&stale_unpaid).await.unwrap();
        store.insert(&fresh_unpaid).await.unwrap();

        let overdue = store.unpaid_created_before(now).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, stale_unpaid.id);

        // Ship one order long ago; it becomes sweepable.
        let shipped = sample_order(user, "SN-3");
        store.insert(&shipped).await.unwrap();
        store
            .update_status(shipped.id, OrderStatusKind::Created, paid_status())
            .await
            .unwrap();
        store
            .update_status(
                shipped.id,
                OrderStatusKind::Paid,
                OrderStatus::Shipped {
                    payment: PaymentRecord {
                        transaction_id: "TX-001".to_string(),
                        paid_at: now,
                    },
                    shipment: crate::status::ShipmentRecord {
                        ship_sn: "SF1".to_string(),
                        ship_channel: "SF".to_string(),
                        shipped_at: now - chrono::Duration::days(10),
                    },
                },
            )
            .await
            .unwrap();

        let sweepable = store.shipped_before(now - chrono::Duration::days(7)).await.unwrap();
        assert_eq!(sweepable.len(), 1);
        assert_eq!(sweepable[0].id, shipped.id);
    }
}
