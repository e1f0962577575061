use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderSn, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Order, OrderLine, OrderPricing, OrderStatus, OrderStatusKind, Result, StoreError,
    stock::{StockError, StockLedger},
    store::OrderStore,
};

/// PostgreSQL-backed order store implementation.
///
/// The conditional status update is expressed directly in SQL:
/// `UPDATE orders SET ... WHERE id = $1 AND status_kind = $2`; a zero
/// affected-row count is reported as an update conflict.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let status_json: serde_json::Value = row.try_get("status")?;
        let status: OrderStatus = serde_json::from_value(status_json)?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            order_sn: OrderSn::new(row.try_get::<String, _>("order_sn")?),
            status,
            consignee: row.try_get("consignee")?,
            mobile: row.try_get("mobile")?,
            address: row.try_get("address")?,
            message: row.try_get("message")?,
            pricing: OrderPricing {
                goods_price: Money::from_cents(row.try_get("goods_price")?),
                freight_price: Money::from_cents(row.try_get("freight_price")?),
                coupon_price: Money::from_cents(row.try_get("coupon_price")?),
                groupon_price: Money::from_cents(row.try_get("groupon_price")?),
                actual_price: Money::from_cents(row.try_get("actual_price")?),
            },
            lines,
            created_at: row.try_get("created_at")?,
            deleted: row.try_get("deleted")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        let specs_json: serde_json::Value = row.try_get("specifications")?;
        let specifications: Vec<String> = serde_json::from_value(specs_json)?;

        Ok(OrderLine {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            goods_name: row.try_get("goods_name")?,
            pic_url: row.try_get("pic_url")?,
            specifications,
            quantity: row.try_get::<i64, _>("quantity")? as u32,
            price: Money::from_cents(row.try_get("price")?),
        })
    }

    async fn lines_for(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, goods_name, pic_url, specifications, quantity, price
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn fetch_order(&self, row: Option<PgRow>) -> Result<Option<Order>> {
        match row {
            Some(row) => {
                let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
                let lines = self.lines_for(id).await?;
                Ok(Some(Self::row_to_order(row, lines)?))
            }
            None => Ok(None),
        }
    }
}

const ORDER_COLUMNS: &str = "id, user_id, order_sn, status_kind, status, consignee, mobile, \
     address, message, goods_price, freight_price, coupon_price, groupon_price, actual_price, \
     created_at, deleted";

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let status_json = serde_json::to_value(&order.status)?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, order_sn, status_kind, status, consignee, mobile,
                address, message, goods_price, freight_price, coupon_price, groupon_price,
                actual_price, created_at, deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.order_sn.as_str())
        .bind(order.status_kind().as_str())
        .bind(status_json)
        .bind(&order.consignee)
        .bind(&order.mobile)
        .bind(&order.address)
        .bind(&order.message)
        .bind(order.pricing.goods_price.cents())
        .bind(order.pricing.freight_price.cents())
        .bind(order.pricing.coupon_price.cents())
        .bind(order.pricing.groupon_price.cents())
        .bind(order.pricing.actual_price.cents())
        .bind(order.created_at)
        .bind(order.deleted)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // Unique violation on the order-number index means a collision.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_order_sn_key")
            {
                return StoreError::DuplicateOrderSn(order.order_sn.clone());
            }
            StoreError::Database(e)
        })?;

        for line in &order.lines {
            let specs_json = serde_json::to_value(&line.specifications)?;
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, goods_name, pic_url,
                    specifications, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(&line.goods_name)
            .bind(&line.pic_url)
            .bind(specs_json)
            .bind(line.quantity as i64)
            .bind(line.price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND NOT deleted"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        self.fetch_order(row).await
    }

    async fn get_for_user(&self, user_id: UserId, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2 AND NOT deleted"
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        self.fetch_order(row).await
    }

    async fn get_by_sn(&self, order_sn: &OrderSn) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_sn = $1 AND NOT deleted"
        ))
        .bind(order_sn.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.fetch_order(row).await
    }

    async fn sn_exists(&self, order_sn: &OrderSn) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_sn = $1)")
                .bind(order_sn.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        statuses: Option<&[OrderStatusKind]>,
    ) -> Result<Vec<Order>> {
        let rows = match statuses {
            Some(kinds) => {
                let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE user_id = $1 AND NOT deleted AND status_kind = ANY($2) \
                     ORDER BY created_at DESC"
                ))
                .bind(user_id.as_uuid())
                .bind(kinds)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE user_id = $1 AND NOT deleted \
                     ORDER BY created_at DESC"
                ))
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let lines = self.lines_for(id).await?;
            orders.push(Self::row_to_order(row, lines)?);
        }
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatusKind,
        status: OrderStatus,
    ) -> Result<Order> {
        let status_json = serde_json::to_value(&status)?;
        let result = sqlx::query(
            r#"
            UPDATE orders SET status_kind = $3, status = $4
            WHERE id = $1 AND status_kind = $2 AND NOT deleted
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(status.kind().as_str())
        .bind(status_json)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Zero rows: the guard missed. Re-read to tell a lost race
            // apart from a missing order.
            let actual: Option<String> = sqlx::query_scalar(
                "SELECT status_kind FROM orders WHERE id = $1 AND NOT deleted",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            return match actual {
                Some(kind) => {
                    let actual = kind.parse::<OrderStatusKind>().map_err(|e| {
                        StoreError::Serialization(serde_json::Error::io(std::io::Error::other(e)))
                    })?;
                    tracing::warn!(order_id = %id, %expected, %actual, "status update lost a race");
                    Err(StoreError::UpdateConflict {
                        order_id: id,
                        expected,
                        actual,
                    })
                }
                None => Err(StoreError::NotFound(id)),
            };
        }

        self.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    async fn mark_deleted(&self, id: OrderId) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET deleted = TRUE WHERE id = $1 AND NOT deleted")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn shipped_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status_kind = 'shipped' AND NOT deleted \
               AND (status #>> '{{shipment,shipped_at}}')::timestamptz <= $1"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let lines = self.lines_for(id).await?;
            orders.push(Self::row_to_order(row, lines)?);
        }
        Ok(orders)
    }

    async fn unpaid_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status_kind = 'created' AND NOT deleted AND created_at <= $1"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let lines = self.lines_for(id).await?;
            orders.push(Self::row_to_order(row, lines)?);
        }
        Ok(orders)
    }
}

/// PostgreSQL-backed stock ledger.
///
/// The decrement is a single conditional update; the database enforces
/// atomicity, no application-side locking.
#[derive(Clone)]
pub struct PgStockLedger {
    pool: PgPool,
}

impl PgStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockLedger for PgStockLedger {
    async fn deduct(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> std::result::Result<(), StockError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(product_id.as_str())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                    .bind(product_id.as_str())
                    .fetch_optional(&self.pool)
                    .await?;

            return match available {
                Some(available) => Err(StockError::Insufficient {
                    product_id: product_id.clone(),
                    requested: quantity,
                    available: available.max(0) as u32,
                }),
                None => Err(StockError::UnknownProduct(product_id.clone())),
            };
        }
        Ok(())
    }

    async fn restore(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> std::result::Result<(), StockError> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(product_id.as_str())
            .bind(quantity as i64)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StockError::UnknownProduct(product_id.clone()));
        }
        Ok(())
    }
}
