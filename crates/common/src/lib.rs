pub mod types;

pub use types::{Money, OrderId, OrderSn, ProductId, UserId};
