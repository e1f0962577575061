//! Lifecycle configuration loaded from environment variables.

use chrono::Duration;

/// Lifecycle windows and retry limits with sensible defaults.
///
/// Reads from environment variables:
/// - `ORDER_AUTO_CONFIRM_DAYS` - days after shipment before the sweep
///   auto-confirms receipt (default: `7`)
/// - `ORDER_UNPAID_TIMEOUT_MINUTES` - minutes an order may sit unpaid
///   before the timeout sweep cancels it (default: `30`)
/// - `ORDER_SN_ATTEMPTS` - order-number collision retries (default: `5`)
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub auto_confirm_days: i64,
    pub unpaid_timeout_minutes: i64,
    pub order_sn_attempts: u32,
}

impl LifecycleConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            auto_confirm_days: std::env::var("ORDER_AUTO_CONFIRM_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            unpaid_timeout_minutes: std::env::var("ORDER_UNPAID_TIMEOUT_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            order_sn_attempts: std::env::var("ORDER_SN_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }

    /// Window after which a shipped order is auto-confirmed.
    pub fn auto_confirm_window(&self) -> Duration {
        Duration::days(self.auto_confirm_days)
    }

    /// Window after which an unpaid order is system-cancelled.
    pub fn unpaid_timeout(&self) -> Duration {
        Duration::minutes(self.unpaid_timeout_minutes)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            auto_confirm_days: 7,
            unpaid_timeout_minutes: 30,
            order_sn_attempts: 5,
        }
    }
}
