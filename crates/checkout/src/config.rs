//! Checkout configuration loaded from environment variables.

use common::Money;

/// Freight and retry knobs for checkout.
///
/// Reads from environment variables:
/// - `CHECKOUT_FREIGHT_CENTS` - flat shipping fee in cents (default: `800`)
/// - `CHECKOUT_FREE_SHIP_THRESHOLD_CENTS` - goods total at or above
///   which shipping is free (default: `8800`)
/// - `ORDER_SN_ATTEMPTS` - order-number collision retries (default: `5`)
/// - `ORDER_UNPAID_TIMEOUT_MINUTES` - minutes before the scheduled
///   cancel fires for an unpaid order (default: `30`)
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub freight_fee: Money,
    pub free_shipping_threshold: Money,
    pub order_sn_attempts: u32,
    pub unpaid_timeout_minutes: i64,
}

impl CheckoutConfig {
    pub fn from_env() -> Self {
        Self {
            freight_fee: Money::from_cents(env_i64("CHECKOUT_FREIGHT_CENTS", 800)),
            free_shipping_threshold: Money::from_cents(env_i64(
                "CHECKOUT_FREE_SHIP_THRESHOLD_CENTS",
                8_800,
            )),
            order_sn_attempts: env_i64("ORDER_SN_ATTEMPTS", 5) as u32,
            unpaid_timeout_minutes: env_i64("ORDER_UNPAID_TIMEOUT_MINUTES", 30),
        }
    }

    /// Freight for a given goods total: free at or above the threshold.
    pub fn freight_for(&self, goods_price: Money) -> Money {
        if goods_price >= self.free_shipping_threshold {
            Money::zero()
        } else {
            self.freight_fee
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            freight_fee: Money::from_cents(800),
            free_shipping_threshold: Money::from_cents(8_800),
            order_sn_attempts: 5,
            unpaid_timeout_minutes: 30,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freight_waived_at_threshold() {
        let config = CheckoutConfig::default();
        assert_eq!(config.freight_for(Money::from_cents(8_799)), Money::from_cents(800));
        assert_eq!(config.freight_for(Money::from_cents(8_800)), Money::zero());
        assert_eq!(config.freight_for(Money::from_cents(20_000)), Money::zero());
    }
}
