//! The order aggregate and its line items.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderSn, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::status::{OrderStatus, OrderStatusKind};

/// One goods line of an order.
///
/// Lines snapshot the catalog at purchase time (name, image, unit price)
/// and are immutable once created; the order total is never recomputed
/// from them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub goods_name: String,
    pub pic_url: String,
    pub specifications: Vec<String>,
    pub quantity: u32,
    /// Unit price at purchase time, decoupled from the live catalog price.
    pub price: Money,
}

impl OrderLine {
    pub fn new(
        product_id: impl Into<ProductId>,
        goods_name: impl Into<String>,
        pic_url: impl Into<String>,
        specifications: Vec<String>,
        quantity: u32,
        price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            goods_name: goods_name.into(),
            pic_url: pic_url.into(),
            specifications,
            quantity,
            price,
        }
    }

    /// Returns quantity times the snapshotted unit price.
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Pricing breakdown fixed at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPricing {
    /// Sum of line subtotals, already net of any group-buy discount.
    pub goods_price: Money,
    pub freight_price: Money,
    /// Coupon discount applied on top.
    pub coupon_price: Money,
    /// Group-buy discount, recorded for display only.
    pub groupon_price: Money,
    /// What the buyer actually owes.
    pub actual_price: Money,
}

impl OrderPricing {
    /// Computes the payable total: `goods + freight - coupon`, clamped at
    /// zero so an oversized coupon never produces a negative charge.
    pub fn new(
        goods_price: Money,
        freight_price: Money,
        coupon_price: Money,
        groupon_price: Money,
    ) -> Self {
        let actual_price = (goods_price + freight_price - coupon_price).clamp_at_zero();
        Self {
            goods_price,
            freight_price,
            coupon_price,
            groupon_price,
            actual_price,
        }
    }
}

/// An order row together with its owned goods lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_sn: OrderSn,
    pub status: OrderStatus,
    pub consignee: String,
    pub mobile: String,
    pub address: String,
    /// Free-form note from the buyer.
    pub message: String,
    pub pricing: OrderPricing,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag; deleted orders are invisible to every query.
    pub deleted: bool,
}

impl Order {
    /// Creates a new order in `Created` status.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: OrderId,
        user_id: UserId,
        order_sn: OrderSn,
        consignee: impl Into<String>,
        mobile: impl Into<String>,
        address: impl Into<String>,
        message: impl Into<String>,
        pricing: OrderPricing,
        lines: Vec<OrderLine>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            order_sn,
            status: OrderStatus::Created,
            consignee: consignee.into(),
            mobile: mobile.into(),
            address: address.into(),
            message: message.into(),
            pricing,
            lines,
            created_at,
            deleted: false,
        }
    }

    /// Returns the status discriminant.
    pub fn status_kind(&self) -> OrderStatusKind {
        self.status.kind()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_actual_is_goods_plus_freight_minus_coupon() {
        let pricing = OrderPricing::new(
            Money::from_cents(10_000),
            Money::from_cents(800),
            Money::from_cents(1_500),
            Money::zero(),
        );
        assert_eq!(pricing.actual_price, Money::from_cents(9_300));
    }

    #[test]
    fn pricing_clamps_at_zero() {
        let pricing = OrderPricing::new(
            Money::from_cents(500),
            Money::zero(),
            Money::from_cents(2_000),
            Money::zero(),
        );
        assert_eq!(pricing.actual_price, Money::zero());
        assert!(!pricing.actual_price.is_negative());
    }

    #[test]
    fn line_subtotal() {
        let line = OrderLine::new(
            "SKU-001",
            "Widget",
            "http://img/w.png",
            vec![],
            3,
            Money::from_cents(1_000),
        );
        assert_eq!(line.subtotal(), Money::from_cents(3_000));
    }

    #[test]
    fn create_starts_in_created_status() {
        let order = Order::create(
            OrderId::new(),
            UserId::new(),
            OrderSn::new("20260825093000AB12CD"),
            "Zhang San",
            "13800000000",
            "1 Example Road",
            "",
            OrderPricing::new(
                Money::from_cents(1_000),
                Money::zero(),
                Money::zero(),
                Money::zero(),
            ),
            vec![OrderLine::new(
                "SKU-001",
                "Widget",
                "",
                vec![],
                1,
                Money::from_cents(1_000),
            )],
            Utc::now(),
        );
        assert_eq!(order.status_kind(), OrderStatusKind::Created);
        assert!(!order.deleted);
        assert_eq!(order.total_quantity(), 1);
    }

    #[test]
    fn order_serialization_roundtrip() {
        let order = Order::create(
            OrderId::new(),
            UserId::new(),
            OrderSn::new("20260825093000AB12CD"),
            "Zhang San",
            "13800000000",
            "1 Example Road",
            "leave at door",
            OrderPricing::new(
                Money::from_cents(2_000),
                Money::from_cents(600),
                Money::zero(),
                Money::zero(),
            ),
            vec![OrderLine::new(
                "SKU-001",
                "Widget",
                "http://img/w.png",
                vec!["blue".to_string()],
                2,
                Money::from_cents(1_000),
            )],
            Utc::now(),
        );
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
