//! Checkout: turns a buyer's cart and address into a created order.
//!
//! The coordinator validates promotions, re-prices the cart server
//! side, deducts stock with compensation on failure, persists the
//! order, clears the cart and schedules the unpaid-timeout cancel.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod input;
pub mod services;

pub use config::CheckoutConfig;
pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, Result};
pub use input::CheckoutInput;
pub use services::{
    Address, AddressBook, CancelScheduler, CartItem, CartSource, InMemoryAddressBook, InMemoryCart,
    InMemoryPromotions, InMemoryScheduler, Promotions,
};
