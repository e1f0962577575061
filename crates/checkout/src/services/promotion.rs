//! Promotion validation trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, UserId};

use crate::error::{CheckoutError, Result};

/// Coupon and group-buy validation at checkout time.
///
/// Discount amounts come back from here so the coordinator never
/// trusts a client-side figure.
#[async_trait]
pub trait Promotions: Send + Sync {
    /// Validates a coupon against the goods total and returns its
    /// discount. Fails with `InvalidCoupon` when the coupon is unknown,
    /// used up, or the total is below its floor.
    async fn coupon_discount(
        &self,
        user_id: UserId,
        coupon_id: &str,
        goods_price: Money,
    ) -> Result<Money>;

    /// Validates open group-buy rules and returns the display discount.
    /// Line prices are already net of it. Fails with `InvalidGroupon`
    /// when the rules are unknown or closed.
    async fn groupon_discount(&self, user_id: UserId, groupon_rules_id: &str) -> Result<Money>;
}

#[derive(Debug, Clone)]
struct CouponRule {
    discount: Money,
    min_goods_price: Money,
}

#[derive(Debug, Default)]
struct InMemoryPromotionState {
    coupons: HashMap<String, CouponRule>,
    groupons: HashMap<String, Money>,
}

/// In-memory promotion rules for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPromotions {
    state: Arc<RwLock<InMemoryPromotionState>>,
}

impl InMemoryPromotions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a coupon with its discount and minimum goods total.
    pub fn add_coupon(
        &self,
        coupon_id: impl Into<String>,
        discount: Money,
        min_goods_price: Money,
    ) {
        self.state.write().unwrap().coupons.insert(
            coupon_id.into(),
            CouponRule {
                discount,
                min_goods_price,
            },
        );
    }

    /// Registers open group-buy rules with their display discount.
    pub fn add_groupon(&self, rules_id: impl Into<String>, discount: Money) {
        self.state
            .write()
            .unwrap()
            .groupons
            .insert(rules_id.into(), discount);
    }
}

#[async_trait]
impl Promotions for InMemoryPromotions {
    async fn coupon_discount(
        &self,
        _user_id: UserId,
        coupon_id: &str,
        goods_price: Money,
    ) -> Result<Money> {
        let state = self.state.read().unwrap();
        let rule = state
            .coupons
            .get(coupon_id)
            .ok_or_else(|| CheckoutError::InvalidCoupon(coupon_id.to_string()))?;
        if goods_price < rule.min_goods_price {
            return Err(CheckoutError::InvalidCoupon(format!(
                "{coupon_id}: goods total below coupon floor"
            )));
        }
        Ok(rule.discount)
    }

    async fn groupon_discount(&self, _user_id: UserId, groupon_rules_id: &str) -> Result<Money> {
        self.state
            .read()
            .unwrap()
            .groupons
            .get(groupon_rules_id)
            .copied()
            .ok_or_else(|| CheckoutError::InvalidGroupon(groupon_rules_id.to_string()))
    }
}
