//! Address book trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;

use crate::error::Result;

/// A shipping address as snapshotted onto an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: String,
    pub consignee: String,
    pub mobile: String,
    /// Region and street, pre-joined into one display line.
    pub detail: String,
}

/// Lookup of a buyer's saved addresses.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Finds an address by ID, scoped to its owner. Returns `None` for
    /// a missing address and for somebody else's address alike.
    async fn find(&self, user_id: UserId, address_id: &str) -> Result<Option<Address>>;
}

/// In-memory address book for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAddressBook {
    addresses: Arc<RwLock<HashMap<(UserId, String), Address>>>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves an address for a user.
    pub fn add(&self, user_id: UserId, address: Address) {
        self.addresses
            .write()
            .unwrap()
            .insert((user_id, address.id.clone()), address);
    }
}

#[async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn find(&self, user_id: UserId, address_id: &str) -> Result<Option<Address>> {
        Ok(self
            .addresses
            .read()
            .unwrap()
            .get(&(user_id, address_id.to_string()))
            .cloned())
    }
}
