//! Collaborator traits checkout depends on, with in-memory
//! implementations for testing.

pub mod address;
pub mod cart;
pub mod promotion;
pub mod scheduler;

pub use address::{Address, AddressBook, InMemoryAddressBook};
pub use cart::{CartItem, CartSource, InMemoryCart};
pub use promotion::{InMemoryPromotions, Promotions};
pub use scheduler::{CancelScheduler, InMemoryScheduler};
