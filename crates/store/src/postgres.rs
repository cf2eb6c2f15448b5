use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    LineItemId, NewLineItem, NewOrder, NewProduct, Order, OrderAggregate, OrderId, OrderLine,
    OrderLineItem, Product, ProductId, Result, StoreError,
    store::{LineItemStore, OrderStore, ProductStore, Store, UnitOfWork},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url` with a bounded pool.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::debug!(max_connections, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

/// Unit of work over a [`PostgresStore`]. Rolls back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

fn quantity_from_db(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        stock_quantity: quantity_from_db(row.try_get("stock_quantity")?, "stock_quantity")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        created_at: row.try_get("created_at")?,
        paid: row.try_get("paid")?,
    })
}

fn row_to_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        product: Product {
            id: ProductId::new(row.try_get("product_id")?),
            name: row.try_get("name")?,
            stock_quantity: quantity_from_db(row.try_get("stock_quantity")?, "stock_quantity")?,
        },
        quantity: quantity_from_db(row.try_get("quantity")?, "quantity")?,
    })
}

impl PostgresTransaction {
    /// Loads the line items of the given orders and joins them onto their headers.
    async fn attach_lines(&mut self, orders: Vec<Order>) -> Result<Vec<OrderAggregate>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let rows = sqlx::query(
            r#"
            SELECT li.order_id, li.quantity, p.id AS product_id, p.name, p.stock_quantity
            FROM order_line_items li
            JOIN products p ON p.id = li.product_id
            WHERE li.order_id = ANY($1)
            ORDER BY li.id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut lines: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let order_id: i64 = row.try_get("order_id")?;
            lines.entry(order_id).or_default().push(row_to_line(row)?);
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderAggregate {
                lines: lines.remove(&order.id.as_i64()).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

#[async_trait]
impl ProductStore for PostgresTransaction {
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, stock_quantity)
            VALUES ($1, $2)
            RETURNING id, name, stock_quantity
            "#,
        )
        .bind(&product.name)
        .bind(i64::from(product.stock_quantity))
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_product(&row)
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, stock_quantity FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, stock_quantity FROM products ORDER BY id ASC")
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<()> {
        let ids: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        sqlx::query("SELECT id FROM products WHERE id = ANY($1) ORDER BY id ASC FOR UPDATE")
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn withdraw_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $2
            WHERE id = $1 AND stock_quantity >= $2
            RETURNING id, name, stock_quantity
            "#,
        )
        .bind(id.as_i64())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *self.tx)
        .await?;

        if row.is_none() {
            tracing::debug!(product_id = %id, quantity, "conditional stock withdrawal matched no row");
        }
        row.as_ref().map(row_to_product).transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresTransaction {
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (created_at, paid)
            VALUES ($1, $2)
            RETURNING id, created_at, paid
            "#,
        )
        .bind(order.created_at)
        .bind(order.paid)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order(&row)
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderAggregate>> {
        let row = sqlx::query("SELECT id, created_at, paid FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = row_to_order(&row)?;
        Ok(self.attach_lines(vec![order]).await?.pop())
    }

    async fn find_all_orders(&mut self) -> Result<Vec<OrderAggregate>> {
        let rows = sqlx::query("SELECT id, created_at, paid FROM orders ORDER BY id ASC")
            .fetch_all(&mut *self.tx)
            .await?;

        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        self.attach_lines(orders).await
    }

    async fn find_orders_by_paid(&mut self, paid: bool) -> Result<Vec<OrderAggregate>> {
        let rows =
            sqlx::query("SELECT id, created_at, paid FROM orders WHERE paid = $1 ORDER BY id ASC")
                .bind(paid)
                .fetch_all(&mut *self.tx)
                .await?;

        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        self.attach_lines(orders).await
    }

    async fn mark_order_paid(&mut self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET paid = TRUE WHERE id = $1 AND paid = FALSE")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl LineItemStore for PostgresTransaction {
    async fn insert_line_item(&mut self, item: NewLineItem) -> Result<OrderLineItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_line_items (order_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, product_id, quantity
            "#,
        )
        .bind(item.order_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(i64::from(item.quantity))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(OrderLineItem {
            id: LineItemId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: quantity_from_db(row.try_get("quantity")?, "quantity")?,
        })
    }
}

#[async_trait]
impl UnitOfWork for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
