//! Order status as a tagged variant.
//!
//! Transition metadata (payment, shipment, refund records and their
//! timestamps) lives inside the variant that introduced it, so an unpaid
//! order cannot carry a payment time and a shipped order always carries
//! its payment record.

use chrono::{DateTime, Utc};
use common::Money;
use serde::{Deserialize, Serialize};

/// Payment details captured when an order becomes `Paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Gateway transaction identifier.
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
}

/// Shipment details captured when an order becomes `Shipped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    /// Carrier tracking number.
    pub ship_sn: String,
    /// Carrier code.
    pub ship_channel: String,
    pub shipped_at: DateTime<Utc>,
}

/// Refund settlement recorded when a refund request is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    /// Amount returned to the buyer, defaulting to the order's full
    /// actual price.
    pub amount: Money,
    /// Channel the money went back through (e.g. original payment).
    pub refund_type: String,
    pub note: String,
    pub refunded_at: DateTime<Utc>,
}

/// Who requested a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelActor {
    User,
    Admin,
    /// Scheduled unpaid-timeout job.
    System,
}

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Created ──► Paid ──► Shipped ──► Confirmed | AutoConfirmed
///    │          │          │
///    │          │          └──► RefundRequested ──► RefundConfirmed
///    │          │                    ▲
///    │          ├────────────────────┘
///    └──────────┴──► Cancelled | AdminCancelled | AutoCancelled
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderStatus {
    /// Checkout submitted, awaiting payment.
    Created,

    /// Payment confirmed by the gateway.
    Paid { payment: PaymentRecord },

    /// Handed to the carrier.
    Shipped {
        payment: PaymentRecord,
        shipment: ShipmentRecord,
    },

    /// Receipt confirmed by the buyer (terminal).
    Confirmed {
        payment: PaymentRecord,
        shipment: ShipmentRecord,
        confirmed_at: DateTime<Utc>,
    },

    /// Receipt confirmed by the unconfirmed-shipment sweep (terminal).
    AutoConfirmed {
        payment: PaymentRecord,
        shipment: ShipmentRecord,
        confirmed_at: DateTime<Utc>,
    },

    /// Cancelled by the buyer before shipment (terminal).
    Cancelled { cancelled_at: DateTime<Utc> },

    /// Cancelled by an operator before shipment (terminal).
    AdminCancelled { cancelled_at: DateTime<Utc> },

    /// Cancelled by the unpaid-timeout job (terminal).
    AutoCancelled { cancelled_at: DateTime<Utc> },

    /// Buyer asked for their money back after paying.
    RefundRequested {
        payment: PaymentRecord,
        reason: String,
        requested_at: DateTime<Utc>,
    },

    /// Refund settled and stock restored (terminal).
    RefundConfirmed {
        payment: PaymentRecord,
        refund: RefundRecord,
    },
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Created
    }
}

impl OrderStatus {
    /// Returns the fieldless discriminant used by the conditional-update
    /// guard and by storage.
    pub fn kind(&self) -> OrderStatusKind {
        match self {
            OrderStatus::Created => OrderStatusKind::Created,
            OrderStatus::Paid { .. } => OrderStatusKind::Paid,
            OrderStatus::Shipped { .. } => OrderStatusKind::Shipped,
            OrderStatus::Confirmed { .. } => OrderStatusKind::Confirmed,
            OrderStatus::AutoConfirmed { .. } => OrderStatusKind::AutoConfirmed,
            OrderStatus::Cancelled { .. } => OrderStatusKind::Cancelled,
            OrderStatus::AdminCancelled { .. } => OrderStatusKind::AdminCancelled,
            OrderStatus::AutoCancelled { .. } => OrderStatusKind::AutoCancelled,
            OrderStatus::RefundRequested { .. } => OrderStatusKind::RefundRequested,
            OrderStatus::RefundConfirmed { .. } => OrderStatusKind::RefundConfirmed,
        }
    }

    /// Builds the cancelled variant for the given actor.
    pub fn cancelled_by(actor: CancelActor, cancelled_at: DateTime<Utc>) -> Self {
        match actor {
            CancelActor::User => OrderStatus::Cancelled { cancelled_at },
            CancelActor::Admin => OrderStatus::AdminCancelled { cancelled_at },
            CancelActor::System => OrderStatus::AutoCancelled { cancelled_at },
        }
    }

    /// Returns the payment record if the order has ever been paid.
    pub fn payment(&self) -> Option<&PaymentRecord> {
        match self {
            OrderStatus::Paid { payment }
            | OrderStatus::Shipped { payment, .. }
            | OrderStatus::Confirmed { payment, .. }
            | OrderStatus::AutoConfirmed { payment, .. }
            | OrderStatus::RefundRequested { payment, .. }
            | OrderStatus::RefundConfirmed { payment, .. } => Some(payment),
            _ => None,
        }
    }

    /// Returns the shipment record if the order has been shipped.
    pub fn shipment(&self) -> Option<&ShipmentRecord> {
        match self {
            OrderStatus::Shipped { shipment, .. }
            | OrderStatus::Confirmed { shipment, .. }
            | OrderStatus::AutoConfirmed { shipment, .. } => Some(shipment),
            _ => None,
        }
    }
}

/// Fieldless status discriminant.
///
/// This is what the optimistic-concurrency guard compares: a transition
/// is a conditional update keyed on the expected prior kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusKind {
    Created,
    Paid,
    Shipped,
    Confirmed,
    AutoConfirmed,
    Cancelled,
    AdminCancelled,
    AutoCancelled,
    RefundRequested,
    RefundConfirmed,
}

impl OrderStatusKind {
    /// Returns true if a payment can be recorded in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatusKind::Created)
    }

    /// Returns true if the order can be handed to a carrier.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatusKind::Paid)
    }

    /// Returns true if receipt can be confirmed.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatusKind::Shipped)
    }

    /// Returns true if the order can still be cancelled. Cancellation is
    /// only legal before shipment.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatusKind::Created | OrderStatusKind::Paid)
    }

    /// Returns true if the buyer can open a refund request.
    pub fn can_request_refund(&self) -> bool {
        matches!(self, OrderStatusKind::Paid)
    }

    /// Returns true if a pending refund request can be settled.
    pub fn can_agree_refund(&self) -> bool {
        matches!(self, OrderStatusKind::RefundRequested)
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatusKind::Confirmed
                | OrderStatusKind::AutoConfirmed
                | OrderStatusKind::Cancelled
                | OrderStatusKind::AdminCancelled
                | OrderStatusKind::AutoCancelled
                | OrderStatusKind::RefundConfirmed
        )
    }

    /// Soft deletion is only legal for terminal orders.
    pub fn can_delete(&self) -> bool {
        self.is_terminal()
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusKind::Created => "created",
            OrderStatusKind::Paid => "paid",
            OrderStatusKind::Shipped => "shipped",
            OrderStatusKind::Confirmed => "confirmed",
            OrderStatusKind::AutoConfirmed => "auto_confirmed",
            OrderStatusKind::Cancelled => "cancelled",
            OrderStatusKind::AdminCancelled => "admin_cancelled",
            OrderStatusKind::AutoCancelled => "auto_cancelled",
            OrderStatusKind::RefundRequested => "refund_requested",
            OrderStatusKind::RefundConfirmed => "refund_confirmed",
        }
    }
}

impl std::fmt::Display for OrderStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatusKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatusKind::Created),
            "paid" => Ok(OrderStatusKind::Paid),
            "shipped" => Ok(OrderStatusKind::Shipped),
            "confirmed" => Ok(OrderStatusKind::Confirmed),
            "auto_confirmed" => Ok(OrderStatusKind::AutoConfirmed),
            "cancelled" => Ok(OrderStatusKind::Cancelled),
            "admin_cancelled" => Ok(OrderStatusKind::AdminCancelled),
            "auto_cancelled" => Ok(OrderStatusKind::AutoCancelled),
            "refund_requested" => Ok(OrderStatusKind::RefundRequested),
            "refund_confirmed" => Ok(OrderStatusKind::RefundConfirmed),
            other => Err(format!("unknown order status kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> PaymentRecord {
        PaymentRecord {
            transaction_id: "TX-001".to_string(),
            paid_at: Utc::now(),
        }
    }

    fn shipment() -> ShipmentRecord {
        ShipmentRecord {
            ship_sn: "SF123456".to_string(),
            ship_channel: "SF".to_string(),
            shipped_at: Utc::now(),
        }
    }

    #[test]
    fn default_status_is_created() {
        assert_eq!(OrderStatus::default().kind(), OrderStatusKind::Created);
    }

    #[test]
    fn created_can_pay_and_cancel_only() {
        let kind = OrderStatusKind::Created;
        assert!(kind.can_pay());
        assert!(kind.can_cancel());
        assert!(!kind.can_ship());
        assert!(!kind.can_confirm());
        assert!(!kind.can_request_refund());
        assert!(!kind.can_delete());
    }

    #[test]
    fn paid_can_ship_cancel_or_request_refund() {
        let kind = OrderStatusKind::Paid;
        assert!(kind.can_ship());
        assert!(kind.can_cancel());
        assert!(kind.can_request_refund());
        assert!(!kind.can_pay());
        assert!(!kind.can_confirm());
    }

    #[test]
    fn shipped_cannot_cancel() {
        let kind = OrderStatusKind::Shipped;
        assert!(kind.can_confirm());
        assert!(!kind.can_cancel());
        assert!(!kind.can_request_refund());
    }

    #[test]
    fn terminal_statuses() {
        for kind in [
            OrderStatusKind::Confirmed,
            OrderStatusKind::AutoConfirmed,
            OrderStatusKind::Cancelled,
            OrderStatusKind::AdminCancelled,
            OrderStatusKind::AutoCancelled,
            OrderStatusKind::RefundConfirmed,
        ] {
            assert!(kind.is_terminal(), "{kind} should be terminal");
            assert!(kind.can_delete());
            assert!(!kind.can_pay());
            assert!(!kind.can_ship());
            assert!(!kind.can_confirm());
            assert!(!kind.can_cancel());
        }
        assert!(!OrderStatusKind::RefundRequested.is_terminal());
        assert!(OrderStatusKind::RefundRequested.can_agree_refund());
    }

    #[test]
    fn cancelled_by_maps_actor_to_variant() {
        let now = Utc::now();
        assert_eq!(
            OrderStatus::cancelled_by(CancelActor::User, now).kind(),
            OrderStatusKind::Cancelled
        );
        assert_eq!(
            OrderStatus::cancelled_by(CancelActor::Admin, now).kind(),
            OrderStatusKind::AdminCancelled
        );
        assert_eq!(
            OrderStatus::cancelled_by(CancelActor::System, now).kind(),
            OrderStatusKind::AutoCancelled
        );
    }

    #[test]
    fn payment_record_visible_from_every_paid_status() {
        let statuses = [
            OrderStatus::Paid { payment: payment() },
            OrderStatus::Shipped {
                payment: payment(),
                shipment: shipment(),
            },
            OrderStatus::RefundRequested {
                payment: payment(),
                reason: "wrong size".to_string(),
                requested_at: Utc::now(),
            },
        ];
        for status in statuses {
            assert_eq!(status.payment().unwrap().transaction_id, "TX-001");
        }
        assert!(OrderStatus::Created.payment().is_none());
    }

    #[test]
    fn kind_roundtrips_through_str() {
        for kind in [
            OrderStatusKind::Created,
            OrderStatusKind::Paid,
            OrderStatusKind::Shipped,
            OrderStatusKind::Confirmed,
            OrderStatusKind::AutoConfirmed,
            OrderStatusKind::Cancelled,
            OrderStatusKind::AdminCancelled,
            OrderStatusKind::AutoCancelled,
            OrderStatusKind::RefundRequested,
            OrderStatusKind::RefundConfirmed,
        ] {
            assert_eq!(kind.as_str().parse::<OrderStatusKind>().unwrap(), kind);
        }
        assert!("teleported".parse::<OrderStatusKind>().is_err());
    }

    #[test]
    fn status_serializes_with_kind_tag() {
        let status = OrderStatus::Paid { payment: payment() };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["kind"], "paid");
        let back: OrderStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }
}
