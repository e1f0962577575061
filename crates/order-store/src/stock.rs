//! Stock ledger with atomic decrement-if-available semantics.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ProductId;
use thiserror::Error;

/// Errors from the stock ledger.
#[derive(Debug, Error)]
pub enum StockError {
    /// The product has no ledger row.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    /// The conditional decrement matched zero rows: not enough stock.
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    Insufficient {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Inventory collaborator for the order lifecycle.
///
/// `deduct` is atomic per product ("decrement where quantity >= requested");
/// partial multi-line failures are the caller's problem to compensate.
/// `restore` is a plain additive increment and is expected to succeed for
/// any product that was previously deducted.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Atomically decrements stock if at least `quantity` is available.
    async fn deduct(&self, product_id: &ProductId, quantity: u32) -> Result<(), StockError>;

    /// Adds stock back (cancellation and refund paths).
    async fn restore(&self, product_id: &ProductId, quantity: u32) -> Result<(), StockError>;
}

/// In-memory stock ledger for testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryStockLedger {
    stock: Arc<RwLock<HashMap<ProductId, u32>>>,
}

impl MemoryStockLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the available stock for a product.
    pub fn set_stock(&self, product_id: impl Into<ProductId>, quantity: u32) {
        self.stock
            .write()
            .unwrap()
            .insert(product_id.into(), quantity);
    }

    /// Returns the available stock for a product, if known.
    pub fn stock_of(&self, product_id: &ProductId) -> Option<u32> {
        self.stock.read().unwrap().get(product_id).copied()
    }
}

#[async_trait]
impl StockLedger for MemoryStockLedger {
    async fn deduct(&self, product_id: &ProductId, quantity: u32) -> Result<(), StockError> {
        let mut stock = self.stock.write().unwrap();
        let available = stock
            .get_mut(product_id)
            .ok_or_else(|| StockError::UnknownProduct(product_id.clone()))?;

        if *available < quantity {
            return Err(StockError::Insufficient {
                product_id: product_id.clone(),
                requested: quantity,
                available: *available,
            });
        }
        *available -= quantity;
        Ok(())
    }

    async fn restore(&self, product_id: &ProductId, quantity: u32) -> Result<(), StockError> {
        let mut stock = self.stock.write().unwrap();
        let available = stock
            .get_mut(product_id)
            .ok_or_else(|| StockError::UnknownProduct(product_id.clone()))?;
        *available += quantity;
        Ok(())
    }
}
