//! Order lifecycle controller.
//!
//! Sits between the transport layer and the order store: checks status
//! preconditions, builds the next status variant and commits it with an
//! optimistic conditional update, then fires post-commit hooks
//! (notification, promotion settlement) and stock compensation.

pub mod config;
pub mod error;
pub mod hooks;
pub mod order_sn;
pub mod service;

pub use config::LifecycleConfig;
pub use error::{OrderServiceError, Result};
pub use hooks::{
    NoopNotifier, NoopPromotionSettlement, Notifier, PromotionSettlement, RecordingNotifier,
    RecordingPromotionSettlement,
};
pub use order_sn::fresh_order_sn;
pub use service::{OrderService, PaymentNotice};
