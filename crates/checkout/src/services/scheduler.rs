//! Unpaid-timeout scheduling trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;

use crate::error::Result;

/// Schedules the deferred cancel that fires if an order is still
/// unpaid at the deadline. The periodic unpaid-timeout sweep backstops
/// a lost schedule, so failures here are logged rather than failing
/// the checkout.
#[async_trait]
pub trait CancelScheduler: Send + Sync {
    async fn schedule_unpaid_cancel(&self, order_id: OrderId, cancel_at: DateTime<Utc>)
    -> Result<()>;
}

/// In-memory scheduler for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduler {
    scheduled: Arc<RwLock<Vec<(OrderId, DateTime<Utc>)>>>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything scheduled so far, in order.
    pub fn scheduled(&self) -> Vec<(OrderId, DateTime<Utc>)> {
        self.scheduled.read().unwrap().clone()
    }
}

#[async_trait]
impl CancelScheduler for InMemoryScheduler {
    async fn schedule_unpaid_cancel(
        &self,
        order_id: OrderId,
        cancel_at: DateTime<Utc>,
    ) -> Result<()> {
        self.scheduled.write().unwrap().push((order_id, cancel_at));
        Ok(())
    }
}
