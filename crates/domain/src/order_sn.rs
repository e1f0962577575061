//! Order-number generation.
//!
//! An order number is a second-resolution timestamp followed by six
//! random uppercase alphanumerics. Uniqueness is enforced by the store's
//! unique constraint; generation retries a bounded number of times on
//! collision instead of looping forever.

use chrono::{DateTime, Utc};
use common::OrderSn;
use rand::distr::{Alphanumeric, SampleString};
use order_store::OrderStore;

use crate::error::{OrderServiceError, Result};

/// Builds one candidate order number for the given instant.
pub fn candidate(now: DateTime<Utc>) -> OrderSn {
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), 6)
        .to_uppercase();
    OrderSn::new(format!("{}{}", now.format("%Y%m%d%H%M%S"), suffix))
}

/// Generates an order number not yet present in the store.
///
/// Fails with [`OrderServiceError::OrderSnExhausted`] after `attempts`
/// collisions. Soft-deleted orders still count as taken.
pub async fn fresh_order_sn<S: OrderStore + ?Sized>(store: &S, attempts: u32) -> Result<OrderSn> {
    for _ in 0..attempts {
        let sn = candidate(Utc::now());
        if !store.sn_exists(&sn).await? {
            return Ok(sn);
        }
        tracing::debug!(order_sn = %sn, "order number collision, retrying");
    }
    Err(OrderServiceError::OrderSnExhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use order_store::MemoryOrderStore;

    #[test]
    fn candidate_has_timestamp_prefix_and_random_suffix() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 9, 30, 0).unwrap();
        let sn = candidate(now);
        assert_eq!(sn.as_str().len(), 20);
        assert!(sn.as_str().starts_with("20260825093000"));
        let suffix = &sn.as_str()[14..];
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn candidates_differ() {
        let now = Utc::now();
        // Two draws at the same instant must still differ in the suffix
        // with overwhelming probability.
        let a = candidate(now);
        let b = candidate(now);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn fresh_sn_from_empty_store() {
        let store = MemoryOrderStore::new();
        let sn = fresh_order_sn(&store, 5).await.unwrap();
        assert_eq!(sn.as_str().len(), 20);
    }
}
