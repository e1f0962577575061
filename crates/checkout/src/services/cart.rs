//! Cart source trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, ProductId, UserId};
use order_store::OrderLine;

use crate::error::{CheckoutError, Result};

/// One checked cart line, priced at read time by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub cart_id: String,
    pub product_id: ProductId,
    pub goods_name: String,
    pub pic_url: String,
    pub specifications: Vec<String>,
    pub quantity: u32,
    /// Current unit price, net of any group-buy discount.
    pub price: Money,
}

impl CartItem {
    /// Converts the cart line into an immutable order line snapshot.
    pub fn into_order_line(self) -> OrderLine {
        OrderLine::new(
            self.product_id,
            self.goods_name,
            self.pic_url,
            self.specifications,
            self.quantity,
            self.price,
        )
    }
}

/// The buyer's cart, read and cleared during checkout.
#[async_trait]
pub trait CartSource: Send + Sync {
    /// Returns the lines being bought: the one entry named by
    /// `cart_id`, or every checked line when it is `None`.
    async fn checked_items(&self, user_id: UserId, cart_id: Option<&str>) -> Result<Vec<CartItem>>;

    /// Removes the bought lines from the cart after the order exists.
    async fn clear_checked(&self, user_id: UserId, cart_id: Option<&str>) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    items: HashMap<UserId, Vec<CartItem>>,
    fail_on_clear: bool,
    clear_calls: u32,
}

/// In-memory cart for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCart {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a user's checked lines.
    pub fn set_items(&self, user_id: UserId, items: Vec<CartItem>) {
        self.state.write().unwrap().items.insert(user_id, items);
    }

    /// Configures the cart to fail on the next clear call.
    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }

    /// Returns how many times `clear_checked` has been called.
    pub fn clear_calls(&self) -> u32 {
        self.state.read().unwrap().clear_calls
    }

    /// Returns a user's remaining lines.
    pub fn remaining(&self, user_id: UserId) -> Vec<CartItem> {
        self.state
            .read()
            .unwrap()
            .items
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CartSource for InMemoryCart {
    async fn checked_items(&self, user_id: UserId, cart_id: Option<&str>) -> Result<Vec<CartItem>> {
        let state = self.state.read().unwrap();
        let items = state.items.get(&user_id).cloned().unwrap_or_default();
        Ok(match cart_id {
            Some(id) => items.into_iter().filter(|i| i.cart_id == id).collect(),
            None => items,
        })
    }

    async fn clear_checked(&self, user_id: UserId, cart_id: Option<&str>) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.clear_calls += 1;
        if state.fail_on_clear {
            return Err(CheckoutError::CartService(
                "cart backend unavailable".to_string(),
            ));
        }
        if let Some(items) = state.items.get_mut(&user_id) {
            match cart_id {
                Some(id) => items.retain(|i| i.cart_id != id),
                None => items.clear(),
            }
        }
        Ok(())
    }
}
