use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, OrderId, ProductId};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::money::Money;
use crate::order::{Order, OrderedLine};

use super::{OrderStore, Pagination};

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

/// Header row of an order before its lines are attached.
struct OrderRow {
    id: Uuid,
    account_id: String,
    created_at: DateTime<Utc>,
    total_price: Decimal,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("order store migrations applied");
        Ok(())
    }

    fn row_to_header(row: PgRow) -> Result<OrderRow> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            created_at: row.try_get("created_at")?,
            total_price: row.try_get("total_price")?,
        })
    }

    fn row_to_line(row: &PgRow) -> Result<(Uuid, OrderedLine)> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("negative quantity {quantity}")))?;
        let line = OrderedLine {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity,
            price: Money::new(row.try_get("price")?),
        };
        Ok((row.try_get("order_id")?, line))
    }

    /// Attaches lines to headers, preserving header order.
    async fn assemble(&self, headers: Vec<OrderRow>) -> Result<Vec<Order>> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, price
            FROM order_products
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderedLine>> = HashMap::new();
        for row in &rows {
            let (order_id, line) = Self::row_to_line(row)?;
            lines.entry(order_id).or_default().push(line);
        }

        headers
            .into_iter()
            .map(|header| {
                let order = Order::from_parts(
                    OrderId::from_uuid(header.id),
                    AccountId::new(header.account_id),
                    header.created_at,
                    lines.remove(&header.id).unwrap_or_default(),
                )
                .map_err(|e| StoreError::Corrupt(format!("order {}: {e}", header.id)))?;

                if order.total_price.amount() != header.total_price {
                    return Err(StoreError::Corrupt(format!(
                        "order {}: stored total {} does not match lines {}",
                        header.id, header.total_price, order.total_price
                    )));
                }
                Ok(order)
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, lines = order.lines.len()))]
    async fn insert(&self, order: &Order) -> Result<()> {
        let start = std::time::Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, account_id, created_at, total_price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.account_id.as_str())
        .bind(order.created_at)
        .bind(order.total_price.amount())
        .execute(&mut *tx)
        .await?;

        for (position, line) in order.lines.iter().enumerate() {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| StoreError::Corrupt(format!("quantity {} too large", line.quantity)))?;

            sqlx::query(
                r#"
                INSERT INTO order_products (order_id, position, product_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(line.product_id.as_str())
            .bind(quantity)
            .bind(line.price.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        metrics::histogram!("order_store_insert_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, created_at, total_price
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let header = Self::row_to_header(row)?;
        Ok(self.assemble(vec![header]).await?.into_iter().next())
    }

    #[tracing::instrument(skip(self), fields(%account_id))]
    async fn list_for_account(
        &self,
        account_id: &AccountId,
        page: Pagination,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, created_at, total_price
            FROM orders
            WHERE account_id = $1
            ORDER BY created_at ASC, id ASC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(account_id.as_str())
        .bind(page.skip as i64)
        .bind(page.take as i64)
        .fetch_all(&self.pool)
        .await?;

        let headers = rows
            .into_iter()
            .map(Self::row_to_header)
            .collect::<Result<Vec<_>>>()?;
        self.assemble(headers).await
    }
}
