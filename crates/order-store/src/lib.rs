pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod status;
pub mod stock;
pub mod store;

pub use common::{Money, OrderId, OrderSn, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::MemoryOrderStore;
pub use order::{Order, OrderLine, OrderPricing};
pub use postgres::{PgOrderStore, PgStockLedger};
pub use status::{
    CancelActor, OrderStatus, OrderStatusKind, PaymentRecord, RefundRecord, ShipmentRecord,
};
pub use stock::{MemoryStockLedger, StockError, StockLedger};
pub use store::OrderStore;
