//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and are ignored by
//! default because they need a local Docker daemon. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use order_store::{
    Money, Order, OrderId, OrderLine, OrderPricing, OrderSn, OrderStatus, OrderStatusKind,
    OrderStore, PaymentRecord, PgOrderStore, PgStockLedger, ProductId, StockError, StockLedger,
    StoreError, UserId,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, order_lines, products")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn sample_order(user_id: UserId, sn: &str) -> Order {
    Order::create(
        OrderId::new(),
        user_id,
        OrderSn::new(sn),
        "Zhang San",
        "13800000000",
        "1 Example Road",
        "leave at door",
        OrderPricing::new(
            Money::from_cents(2_000),
            Money::from_cents(600),
            Money::from_cents(100),
            Money::zero(),
        ),
        vec![OrderLine::new(
            "SKU-001",
            "Widget",
            "http://img/w.png",
            vec!["blue".to_string()],
            2,
            Money::from_cents(1_000),
        )],
        Utc::now(),
    )
}

fn paid_status() -> OrderStatus {
    OrderStatus::Paid {
        payment: PaymentRecord {
            transaction_id: "TX-001".to_string(),
            paid_at: Utc::now(),
        },
    }
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn insert_and_roundtrip_order() {
    let store = PgOrderStore::new(get_test_pool().await);
    let user = UserId::new();
    let order = sample_order(user, "PGSN-1");

    store.insert(&order).await.unwrap();

    let loaded = store.get(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.order_sn, order.order_sn);
    assert_eq!(loaded.status_kind(), OrderStatusKind::Created);
    assert_eq!(loaded.pricing, order.pricing);
    assert_eq!(loaded.lines, order.lines);

    let by_sn = store.get_by_sn(&order.order_sn).await.unwrap().unwrap();
    assert_eq!(by_sn.id, order.id);
    assert!(store.sn_exists(&order.order_sn).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn duplicate_order_sn_rejected() {
    let store = PgOrderStore::new(get_test_pool().await);
    let user = UserId::new();
    store.insert(&sample_order(user, "PGSN-DUP")).await.unwrap();

    let result = store.insert(&sample_order(user, "PGSN-DUP")).await;
    assert!(matches!(result, Err(StoreError::DuplicateOrderSn(_))));
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn conditional_update_detects_lost_race() {
    let store = PgOrderStore::new(get_test_pool().await);
    let order = sample_order(UserId::new(), "PGSN-2");
    store.insert(&order).await.unwrap();

    store
        .update_status(order.id, OrderStatusKind::Created, paid_status())
        .await
        .unwrap();

    let result = store
        .update_status(order.id, OrderStatusKind::Created, paid_status())
        .await;
    assert!(matches!(
        result,
        Err(StoreError::UpdateConflict {
            expected: OrderStatusKind::Created,
            actual: OrderStatusKind::Paid,
            ..
        })
    ));

    let stored = store.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status_kind(), OrderStatusKind::Paid);
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn soft_delete_hides_but_reserves_sn() {
    let store = PgOrderStore::new(get_test_pool().await);
    let user = UserId::new();
    let order = sample_order(user, "PGSN-3");
    store.insert(&order).await.unwrap();

    store.mark_deleted(order.id).await.unwrap();
    assert!(store.get(order.id).await.unwrap().is_none());
    assert!(store.list_for_user(user, None).await.unwrap().is_empty());
    assert!(store.sn_exists(&order.order_sn).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn stock_ledger_conditional_decrement() {
    let pool = get_test_pool().await;
    sqlx::query("INSERT INTO products (id, stock) VALUES ('SKU-001', 3)")
        .execute(&pool)
        .await
        .unwrap();

    let ledger = PgStockLedger::new(pool.clone());
    let sku = ProductId::new("SKU-001");

    ledger.deduct(&sku, 2).await.unwrap();

    let result = ledger.deduct(&sku, 2).await;
    assert!(matches!(
        result,
        Err(StockError::Insufficient {
            requested: 2,
            available: 1,
            ..
        })
    ));

    ledger.restore(&sku, 2).await.unwrap();
    let stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = 'SKU-001'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stock, 3);

    let missing = ledger.deduct(&ProductId::new("SKU-404"), 1).await;
    assert!(matches!(missing, Err(StockError::UnknownProduct(_))));
}
