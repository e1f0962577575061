//! Side-effect seams fired around lifecycle transitions.
//!
//! Both hooks run after the status write has committed, so a hook
//! failure never rolls a transition back. Failures are logged and
//! swallowed; a paid order stays paid even when the mail service is
//! down.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use order_store::Order;

/// Outbound notification on payment (buyer SMS, operator mail).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Called once an order has transitioned to paid.
    async fn order_paid(&self, order: &Order);
}

/// Settlement of promotion state tied to a paid order, e.g. marking a
/// group-buy participation as paid and checking whether the group is
/// now complete.
#[async_trait]
pub trait PromotionSettlement: Send + Sync {
    /// Called once an order has transitioned to paid. An `Err` is
    /// logged by the caller; it never fails the payment.
    async fn settle_paid_order(&self, order: &Order) -> Result<(), String>;
}

/// No-op notifier for deployments without a messaging channel.
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn order_paid(&self, _order: &Order) {}
}

/// No-op settlement for deployments without promotions.
#[derive(Debug, Default, Clone)]
pub struct NoopPromotionSettlement;

#[async_trait]
impl PromotionSettlement for NoopPromotionSettlement {
    async fn settle_paid_order(&self, _order: &Order) -> Result<(), String> {
        Ok(())
    }
}

/// Recording notifier for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notified: Arc<RwLock<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order numbers notified so far, in order.
    pub fn notified_sns(&self) -> Vec<String> {
        self.notified.read().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_paid(&self, order: &Order) {
        self.notified
            .write()
            .unwrap()
            .push(order.order_sn.to_string());
    }
}

/// Recording settlement with a failure toggle for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingPromotionSettlement {
    settled: Arc<RwLock<Vec<String>>>,
    fail: Arc<RwLock<bool>>,
}

impl RecordingPromotionSettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.write().unwrap() = fail;
    }

    pub fn settled_sns(&self) -> Vec<String> {
        self.settled.read().unwrap().clone()
    }
}

#[async_trait]
impl PromotionSettlement for RecordingPromotionSettlement {
    async fn settle_paid_order(&self, order: &Order) -> Result<(), String> {
        if *self.fail.read().unwrap() {
            return Err("promotion settlement unavailable".to_string());
        }
        self.settled
            .write()
            .unwrap()
            .push(order.order_sn.to_string());
        Ok(())
    }
}
