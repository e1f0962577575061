//! Checkout submission parameters.

use serde::{Deserialize, Serialize};

/// What the buyer sends when submitting an order.
///
/// Everything here is an identifier into the buyer's own data (address
/// book, cart, coupon wallet); the server re-reads and re-prices all of
/// it and never trusts client-side totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutInput {
    /// Shipping address to snapshot onto the order.
    pub address_id: String,
    /// Specific cart entry to buy immediately, or `None` for every
    /// checked cart line.
    pub cart_id: Option<String>,
    /// Coupon to apply, if any.
    pub coupon_id: Option<String>,
    /// Group-buy rules the buyer is joining, if any.
    pub groupon_rules_id: Option<String>,
    /// Free-form note to the seller.
    #[serde(default)]
    pub message: String,
}

impl CheckoutInput {
    /// Plain checkout of all checked cart lines, no promotions.
    pub fn simple(address_id: impl Into<String>) -> Self {
        Self {
            address_id: address_id.into(),
            cart_id: None,
            coupon_id: None,
            groupon_rules_id: None,
            message: String::new(),
        }
    }
}
