//! The order lifecycle controller.
//!
//! Every transition follows the same shape: load the order, check the
//! status precondition, then write the new status with a conditional
//! update guarded on the expected prior kind. Two callers racing the
//! same transition means exactly one wins; the loser gets
//! [`OrderServiceError::UpdateConflict`] and decides whether to reload.
//! No rows are locked at any point.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderSn, UserId};
use order_store::{
    CancelActor, Order, OrderStatus, OrderStatusKind, OrderStore, PaymentRecord, RefundRecord,
    ShipmentRecord, StockLedger,
};

use crate::config::LifecycleConfig;
use crate::error::{OrderServiceError, Result};
use crate::hooks::{Notifier, PromotionSettlement};

/// A payment-gateway callback.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PaymentNotice {
    pub order_sn: OrderSn,
    pub transaction_id: String,
    /// Amount the gateway says was collected, in exact cents.
    pub amount: Money,
}

/// Orchestrates order status transitions over a store, a stock ledger
/// and the post-payment hooks.
pub struct OrderService<S, L, N, P> {
    store: S,
    ledger: L,
    notifier: N,
    promotions: P,
    config: LifecycleConfig,
}

impl<S, L, N, P> OrderService<S, L, N, P>
where
    S: OrderStore,
    L: StockLedger,
    N: Notifier,
    P: PromotionSettlement,
{
    pub fn new(store: S, ledger: L, notifier: N, promotions: P, config: LifecycleConfig) -> Self {
        Self {
            store,
            ledger,
            notifier,
            promotions,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Direct access to the underlying store (admin queries).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an order scoped to its owner.
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        self.store
            .get_for_user(user_id, order_id)
            .await?
            .ok_or(OrderServiceError::NotFound(order_id))
    }

    /// Lists a user's orders, newest first, optionally filtered by
    /// status kind.
    pub async fn list_orders(
        &self,
        user_id: UserId,
        statuses: Option<&[OrderStatusKind]>,
    ) -> Result<Vec<Order>> {
        Ok(self.store.list_for_user(user_id, statuses).await?)
    }

    /// Records a confirmed payment on a created order.
    ///
    /// Fires promotion settlement and the paid notification after the
    /// write commits; neither can fail the payment.
    #[tracing::instrument(skip(self))]
    pub async fn pay(&self, order_id: OrderId, transaction_id: &str) -> Result<Order> {
        let order = self.load(order_id).await?;
        let current = order.status_kind();
        if !current.can_pay() {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "pay",
            });
        }

        let status = OrderStatus::Paid {
            payment: PaymentRecord {
                transaction_id: transaction_id.to_string(),
                paid_at: Utc::now(),
            },
        };
        let order = self
            .store
            .update_status(order_id, OrderStatusKind::Created, status)
            .await?;

        if let Err(reason) = self.promotions.settle_paid_order(&order).await {
            tracing::error!(order_sn = %order.order_sn, %reason, "promotion settlement failed");
            metrics::counter!("order_promotion_settlement_failures").increment(1);
        }
        self.notifier.order_paid(&order).await;

        tracing::info!(order_sn = %order.order_sn, %transaction_id, "order paid");
        metrics::counter!("orders_paid").increment(1);
        Ok(order)
    }

    /// Handles a payment-gateway callback.
    ///
    /// Redelivery of a notice for an already-paid order is a success
    /// no-op. A notified amount that differs from the stored total by
    /// even one cent is rejected.
    #[tracing::instrument(skip(self, notice), fields(order_sn = %notice.order_sn))]
    pub async fn notify_payment(&self, notice: PaymentNotice) -> Result<Order> {
        let order = self
            .store
            .get_by_sn(&notice.order_sn)
            .await?
            .ok_or_else(|| OrderServiceError::UnknownOrderNumber(notice.order_sn.clone()))?;

        if order.status.payment().is_some() {
            tracing::debug!(order_sn = %order.order_sn, "duplicate payment notice ignored");
            return Ok(order);
        }

        if notice.amount != order.pricing.actual_price {
            tracing::error!(
                order_sn = %order.order_sn,
                notified = %notice.amount,
                expected = %order.pricing.actual_price,
                "payment amount mismatch"
            );
            metrics::counter!("order_payment_amount_mismatches").increment(1);
            return Err(OrderServiceError::AmountMismatch {
                order_sn: notice.order_sn,
                expected: order.pricing.actual_price,
                notified: notice.amount,
            });
        }

        self.pay(order.id, &notice.transaction_id).await
    }

    /// Records shipment of a paid order (operator action).
    #[tracing::instrument(skip(self))]
    pub async fn ship(
        &self,
        order_id: OrderId,
        ship_sn: &str,
        ship_channel: &str,
    ) -> Result<Order> {
        let order = self.load(order_id).await?;
        let current = order.status_kind();
        let Some(payment) = order.status.payment().cloned() else {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "ship",
            });
        };
        if !current.can_ship() {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "ship",
            });
        }

        let status = OrderStatus::Shipped {
            payment,
            shipment: ShipmentRecord {
                ship_sn: ship_sn.to_string(),
                ship_channel: ship_channel.to_string(),
                shipped_at: Utc::now(),
            },
        };
        let order = self
            .store
            .update_status(order_id, OrderStatusKind::Paid, status)
            .await?;
        tracing::info!(order_sn = %order.order_sn, %ship_sn, "order shipped");
        metrics::counter!("orders_shipped").increment(1);
        Ok(order)
    }

    /// Buyer confirms receipt of a shipped order.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self.get_order(user_id, order_id).await?;
        let order = self.confirm_order(order, false).await?;
        metrics::counter!("orders_confirmed").increment(1);
        Ok(order)
    }

    /// Buyer cancels an order before shipment. Deducted stock is
    /// restored.
    #[tracing::instrument(skip(self))]
    pub async fn user_cancel(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self.get_order(user_id, order_id).await?;
        self.cancel_order(order, CancelActor::User).await
    }

    /// Operator cancels an order before shipment.
    #[tracing::instrument(skip(self))]
    pub async fn admin_cancel(&self, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        self.cancel_order(order, CancelActor::Admin).await
    }

    /// Scheduled job cancels an order that was never paid.
    #[tracing::instrument(skip(self))]
    pub async fn system_cancel(&self, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        self.cancel_order(order, CancelActor::System).await
    }

    /// Buyer asks for their money back on a paid, unshipped order.
    #[tracing::instrument(skip(self, reason))]
    pub async fn request_refund(
        &self,
        user_id: UserId,
        order_id: OrderId,
        reason: &str,
    ) -> Result<Order> {
        let order = self.get_order(user_id, order_id).await?;
        let current = order.status_kind();
        let Some(payment) = order.status.payment().cloned() else {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "request a refund for",
            });
        };
        if !current.can_request_refund() {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "request a refund for",
            });
        }

        let status = OrderStatus::RefundRequested {
            payment,
            reason: reason.to_string(),
            requested_at: Utc::now(),
        };
        let order = self
            .store
            .update_status(order_id, OrderStatusKind::Paid, status)
            .await?;
        tracing::info!(order_sn = %order.order_sn, "refund requested");
        metrics::counter!("order_refunds_requested").increment(1);
        Ok(order)
    }

    /// Operator settles a pending refund request. The refunded amount
    /// defaults to the order's full actual price, and the order's stock
    /// goes back on the shelf.
    #[tracing::instrument(skip(self, note))]
    pub async fn agree_refund(
        &self,
        order_id: OrderId,
        refund_type: &str,
        note: &str,
        amount: Option<Money>,
    ) -> Result<Order> {
        let order = self.load(order_id).await?;
        let current = order.status_kind();
        let Some(payment) = order.status.payment().cloned() else {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "refund",
            });
        };
        if !current.can_agree_refund() {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "refund",
            });
        }

        let status = OrderStatus::RefundConfirmed {
            payment,
            refund: RefundRecord {
                amount: amount.unwrap_or(order.pricing.actual_price),
                refund_type: refund_type.to_string(),
                note: note.to_string(),
                refunded_at: Utc::now(),
            },
        };
        let order = self
            .store
            .update_status(order_id, OrderStatusKind::RefundRequested, status)
            .await?;
        self.restore_stock(&order).await;
        tracing::info!(order_sn = %order.order_sn, "refund confirmed");
        metrics::counter!("order_refunds_confirmed").increment(1);
        Ok(order)
    }

    /// Buyer hides a finished order from their history. The order
    /// number stays reserved and the row survives for bookkeeping.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, order_id: OrderId) -> Result<()> {
        let order = self.get_order(user_id, order_id).await?;
        let current = order.status_kind();
        if !current.can_delete() {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "delete",
            });
        }
        self.store.mark_deleted(order_id).await?;
        tracing::info!(order_sn = %order.order_sn, "order soft-deleted");
        Ok(())
    }

    /// Auto-confirms orders shipped longer ago than the configured
    /// window. Returns how many orders were confirmed.
    ///
    /// A conflict on one order (somebody confirmed or refunded it
    /// between the scan and the write) skips that order and keeps
    /// sweeping.
    #[tracing::instrument(skip(self))]
    pub async fn auto_confirm_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - self.config.auto_confirm_window();
        let overdue = self.store.shipped_before(cutoff).await?;

        let mut confirmed = 0;
        for order in overdue {
            match self.confirm_order(order, true).await {
                Ok(_) => confirmed += 1,
                Err(
                    OrderServiceError::UpdateConflict { order_id, .. }
                    | OrderServiceError::NotFound(order_id),
                ) => {
                    tracing::warn!(%order_id, "order changed mid-sweep, skipping");
                }
                Err(OrderServiceError::InvalidTransition { current, .. }) => {
                    tracing::warn!(%current, "order changed mid-sweep, skipping");
                }
                Err(other) => return Err(other),
            }
        }
        if confirmed > 0 {
            tracing::info!(confirmed, "auto-confirm sweep finished");
            metrics::counter!("orders_auto_confirmed").increment(confirmed as u64);
        }
        Ok(confirmed)
    }

    /// Cancels orders that sat unpaid past the configured timeout and
    /// puts their stock back. Returns how many orders were cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_overdue_unpaid(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - self.config.unpaid_timeout();
        let overdue = self.store.unpaid_created_before(cutoff).await?;

        let mut cancelled = 0;
        for order in overdue {
            match self.cancel_order(order, CancelActor::System).await {
                Ok(_) => cancelled += 1,
                Err(
                    OrderServiceError::UpdateConflict { order_id, .. }
                    | OrderServiceError::NotFound(order_id),
                ) => {
                    tracing::warn!(%order_id, "order changed mid-sweep, skipping");
                }
                Err(OrderServiceError::InvalidTransition { current, .. }) => {
                    tracing::warn!(%current, "order changed mid-sweep, skipping");
                }
                Err(other) => return Err(other),
            }
        }
        if cancelled > 0 {
            tracing::info!(cancelled, "unpaid-timeout sweep finished");
            metrics::counter!("orders_auto_cancelled").increment(cancelled as u64);
        }
        Ok(cancelled)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or(OrderServiceError::NotFound(order_id))
    }

    async fn confirm_order(&self, order: Order, auto: bool) -> Result<Order> {
        let current = order.status_kind();
        let (Some(payment), Some(shipment)) = (
            order.status.payment().cloned(),
            order.status.shipment().cloned(),
        ) else {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "confirm",
            });
        };
        if !current.can_confirm() {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "confirm",
            });
        }

        let confirmed_at = Utc::now();
        let status = if auto {
            OrderStatus::AutoConfirmed {
                payment,
                shipment,
                confirmed_at,
            }
        } else {
            OrderStatus::Confirmed {
                payment,
                shipment,
                confirmed_at,
            }
        };
        let order = self
            .store
            .update_status(order.id, OrderStatusKind::Shipped, status)
            .await?;
        tracing::info!(order_sn = %order.order_sn, auto, "order confirmed");
        Ok(order)
    }

    async fn cancel_order(&self, order: Order, actor: CancelActor) -> Result<Order> {
        let current = order.status_kind();
        if !current.can_cancel() {
            return Err(OrderServiceError::InvalidTransition {
                current,
                action: "cancel",
            });
        }

        let status = OrderStatus::cancelled_by(actor, Utc::now());
        let order = self.store.update_status(order.id, current, status).await?;
        self.restore_stock(&order).await;
        tracing::info!(order_sn = %order.order_sn, ?actor, "order cancelled");
        metrics::counter!("orders_cancelled").increment(1);
        Ok(order)
    }

    /// Puts an order's deducted stock back on the shelf. The status
    /// write has already committed, so a restore failure is logged and
    /// counted rather than unwinding the cancellation.
    async fn restore_stock(&self, order: &Order) {
        for line in &order.lines {
            if let Err(e) = self.ledger.restore(&line.product_id, line.quantity).await {
                tracing::error!(
                    order_sn = %order.order_sn,
                    product_id = %line.product_id,
                    error = %e,
                    "stock restore failed"
                );
                metrics::counter!("order_stock_restore_failures").increment(1);
            }
        }
    }
}
