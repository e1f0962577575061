//! The checkout coordinator.
//!
//! Submitting an order is a multi-step flow against collaborators that
//! cannot share a transaction: validate promotions and address, re-price
//! the cart server-side, deduct stock line by line, then persist the
//! order. Stock deduction is the step with side effects before the
//! order exists, so any later failure compensates by restoring every
//! line already deducted.

use chrono::{Duration, Utc};
use common::{Money, OrderId, UserId};
use domain::order_sn::fresh_order_sn;
use order_store::{Order, OrderLine, OrderPricing, OrderStore, StockLedger};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, Result};
use crate::input::CheckoutInput;
use crate::services::{AddressBook, CancelScheduler, CartSource, Promotions};

/// Runs the checkout flow end to end.
pub struct CheckoutCoordinator<S, L, A, C, P, T> {
    store: S,
    ledger: L,
    address_book: A,
    cart: C,
    promotions: P,
    scheduler: T,
    config: CheckoutConfig,
}

impl<S, L, A, C, P, T> CheckoutCoordinator<S, L, A, C, P, T>
where
    S: OrderStore,
    L: StockLedger,
    A: AddressBook,
    C: CartSource,
    P: Promotions,
    T: CancelScheduler,
{
    pub fn new(
        store: S,
        ledger: L,
        address_book: A,
        cart: C,
        promotions: P,
        scheduler: T,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            address_book,
            cart,
            promotions,
            scheduler,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Submits a checkout and returns the created order in `Created`
    /// status, awaiting payment.
    #[tracing::instrument(skip(self, input), fields(address_id = %input.address_id))]
    pub async fn submit(&self, user_id: UserId, input: CheckoutInput) -> Result<Order> {
        let started = std::time::Instant::now();
        metrics::counter!("checkout_submissions_total").increment(1);

        let groupon_price = match &input.groupon_rules_id {
            Some(rules_id) => self.promotions.groupon_discount(user_id, rules_id).await?,
            None => Money::zero(),
        };

        let address = self
            .address_book
            .find(user_id, &input.address_id)
            .await?
            .ok_or_else(|| CheckoutError::BadAddress(input.address_id.clone()))?;

        let items = self
            .cart
            .checked_items(user_id, input.cart_id.as_deref())
            .await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Server-side reprice from the cart's current unit prices.
        let lines: Vec<OrderLine> = items.into_iter().map(|i| i.into_order_line()).collect();
        let goods_price: Money = lines.iter().map(|l| l.subtotal()).sum();

        let coupon_price = match &input.coupon_id {
            Some(coupon_id) => {
                self.promotions
                    .coupon_discount(user_id, coupon_id, goods_price)
                    .await?
            }
            None => Money::zero(),
        };
        let freight_price = self.config.freight_for(goods_price);
        let pricing = OrderPricing::new(goods_price, freight_price, coupon_price, groupon_price);

        let order_sn = fresh_order_sn(&self.store, self.config.order_sn_attempts).await?;

        // Deduct stock line by line; a failure restores what was taken.
        let mut deducted: Vec<(&OrderLine, u32)> = Vec::with_capacity(lines.len());
        for line in &lines {
            if let Err(e) = self.ledger.deduct(&line.product_id, line.quantity).await {
                tracing::warn!(
                    product_id = %line.product_id,
                    error = %e,
                    "stock deduction failed, compensating"
                );
                self.compensate(&deducted).await;
                metrics::counter!("checkout_stock_failures_total").increment(1);
                return Err(e.into());
            }
            deducted.push((line, line.quantity));
        }

        let created_at = Utc::now();
        let order = Order::create(
            OrderId::new(),
            user_id,
            order_sn,
            address.consignee,
            address.mobile,
            address.detail,
            input.message,
            pricing,
            lines.clone(),
            created_at,
        );
        if let Err(e) = self.store.insert(&order).await {
            tracing::warn!(error = %e, "order insert failed, compensating stock");
            self.compensate(&deducted).await;
            return Err(e.into());
        }

        // Post-commit steps: the order stands even if these fail.
        if let Err(e) = self
            .cart
            .clear_checked(user_id, input.cart_id.as_deref())
            .await
        {
            tracing::warn!(order_sn = %order.order_sn, error = %e, "cart clear failed");
        }
        let cancel_at = created_at + Duration::minutes(self.config.unpaid_timeout_minutes);
        if let Err(e) = self
            .scheduler
            .schedule_unpaid_cancel(order.id, cancel_at)
            .await
        {
            tracing::error!(order_sn = %order.order_sn, error = %e, "cancel scheduling failed");
        }

        tracing::info!(
            order_sn = %order.order_sn,
            actual_price = %order.pricing.actual_price,
            lines = order.lines.len(),
            "checkout submitted"
        );
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        metrics::counter!("checkout_orders_created_total").increment(1);
        Ok(order)
    }

    /// Restores every line deducted so far. Restore failures are logged
    /// and counted; there is nothing further to unwind.
    async fn compensate(&self, deducted: &[(&OrderLine, u32)]) {
        for (line, quantity) in deducted.iter().rev() {
            if let Err(e) = self.ledger.restore(&line.product_id, *quantity).await {
                tracing::error!(
                    product_id = %line.product_id,
                    error = %e,
                    "stock compensation failed"
                );
                metrics::counter!("checkout_compensation_failures_total").increment(1);
            }
        }
    }
}
