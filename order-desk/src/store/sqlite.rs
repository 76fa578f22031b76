//! SQLite Order Store
//!
//! Decimals are stored as TEXT, timestamps as Unix millis. Multi-table reads
//! run in one transaction so an order and its items share a snapshot.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::error::{AppError, AppResult};
use shared::models::{
    Order, OrderCreate, OrderItem, OrderItemExtra, OrderStatus, OrderType, VarietySelection,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{OrderStore, StoreError, StoreResult};

const ORDER_COLUMNS: &str = "id, order_type, table_number, status, total, customer_name, \
     customer_phone, delivery_address, delivery_fee, notes, created_at";

/// Bound ids per `IN (...)` list, well under SQLite's variable limit
const IN_LIST_CHUNK: usize = 500;

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_type: String,
    table_number: i32,
    status: String,
    total: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    delivery_address: Option<String>,
    delivery_fee: String,
    notes: Option<String>,
    created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    order_id: String,
    product_name: String,
    quantity: i32,
    unit_price: String,
    subtotal: String,
    variety_name: Option<String>,
    variety_price: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ExtraRow {
    id: String,
    order_item_id: String,
    extra_name: String,
    price: String,
    quantity: i32,
}

fn decimal(column: &str, raw: &str) -> StoreResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| StoreError::Decode(format!("{column}: invalid decimal '{raw}': {e}")))
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> StoreResult<Order> {
        let order_type = OrderType::from_str(&self.order_type)
            .map_err(|e| StoreError::Decode(format!("order {}: {}", self.id, e)))?;
        let status = OrderStatus::from_str(&self.status)
            .map_err(|e| StoreError::Decode(format!("order {}: {}", self.id, e)))?;
        Ok(Order {
            total: decimal("total", &self.total)?,
            delivery_fee: decimal("delivery_fee", &self.delivery_fee)?,
            id: self.id,
            order_type,
            table_number: self.table_number,
            status,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            delivery_address: self.delivery_address,
            notes: self.notes,
            created_at: self.created_at,
            items,
        })
    }
}

impl ItemRow {
    fn into_item(self, extras: Vec<OrderItemExtra>) -> StoreResult<OrderItem> {
        let variety = match (self.variety_name, self.variety_price) {
            (Some(name), Some(price)) => Some(VarietySelection {
                name,
                price: decimal("variety_price", &price)?,
            }),
            _ => None,
        };
        Ok(OrderItem {
            unit_price: decimal("unit_price", &self.unit_price)?,
            subtotal: decimal("subtotal", &self.subtotal)?,
            id: self.id,
            product_name: self.product_name,
            quantity: self.quantity,
            variety,
            notes: self.notes,
            extras,
        })
    }
}

impl ExtraRow {
    fn into_extra(self) -> StoreResult<OrderItemExtra> {
        Ok(OrderItemExtra {
            price: decimal("price", &self.price)?,
            id: self.id,
            extra_name: self.extra_name,
            quantity: self.quantity,
        })
    }
}

// ============================================================================
// Store
// ============================================================================

/// SQLite-backed [`OrderStore`]
#[derive(Clone)]
pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    /// Open (or create) a database file with WAL mode and run migrations
    pub async fn open(db_path: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| AppError::config(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Failed to open database: {e}")))?;

        tracing::info!(path = %db_path, "Database connection established (SQLite WAL, busy_timeout=5000ms)");
        Self::from_pool(pool).await
    }

    /// Private in-memory database, one connection kept alive for the pool lifetime
    pub async fn open_in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::config(format!("Invalid database url: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Failed to open database: {e}")))?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> AppResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::store_unavailable(format!("Failed to apply migrations: {e}")))?;
        tracing::debug!("Database migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checkout entry point: validate, snapshot, and insert one order
    pub async fn create_order(&self, input: OrderCreate, created_at: i64) -> AppResult<Order> {
        let order = Order::from_create(input, created_at)?;
        self.insert(&order).await.map_err(AppError::from)?;
        tracing::info!(
            order_id = %order.id,
            order_type = %order.order_type,
            total = %order.total,
            "Order created"
        );
        Ok(order)
    }

    /// Insert a complete order snapshot (order, items, extras) atomically
    pub async fn insert(&self, order: &Order) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, order_type, table_number, status, total, customer_name, \
             customer_phone, delivery_address, delivery_fee, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(order.order_type.as_str())
        .bind(order.table_number)
        .bind(order.status.as_str())
        .bind(order.total.to_string())
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.delivery_address)
        .bind(order.delivery_fee.to_string())
        .bind(&order.notes)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, position, product_name, quantity, \
                 unit_price, subtotal, variety_name, variety_price, notes) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(position as i64)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price.to_string())
            .bind(item.subtotal.to_string())
            .bind(item.variety.as_ref().map(|v| v.name.clone()))
            .bind(item.variety.as_ref().map(|v| v.price.to_string()))
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;

            for (extra_position, extra) in item.extras.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO order_item_extras (id, order_item_id, position, extra_name, price, quantity) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&extra.id)
                .bind(&item.id)
                .bind(extra_position as i64)
                .bind(&extra.extra_name)
                .bind(extra.price.to_string())
                .bind(extra.quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Attach items and extras to order rows, preserving row order
    async fn hydrate(conn: &mut SqliteConnection, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
        let mut item_rows: Vec<ItemRow> = Vec::new();
        let mut extra_rows: Vec<ExtraRow> = Vec::new();

        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT id, order_id, product_name, quantity, unit_price, subtotal, variety_name, \
                 variety_price, notes FROM order_items WHERE order_id IN (",
            );
            let mut sep = qb.separated(", ");
            for id in chunk {
                sep.push_bind(*id);
            }
            qb.push(") ORDER BY order_id, position");
            item_rows.extend(qb.build_query_as::<ItemRow>().fetch_all(&mut *conn).await?);

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT e.id, e.order_item_id, e.extra_name, e.price, e.quantity \
                 FROM order_item_extras e JOIN order_items i ON e.order_item_id = i.id \
                 WHERE i.order_id IN (",
            );
            let mut sep = qb.separated(", ");
            for id in chunk {
                sep.push_bind(*id);
            }
            qb.push(") ORDER BY e.order_item_id, e.position");
            extra_rows.extend(qb.build_query_as::<ExtraRow>().fetch_all(&mut *conn).await?);
        }

        let mut extras_by_item: HashMap<String, Vec<OrderItemExtra>> = HashMap::new();
        for extra in extra_rows {
            extras_by_item
                .entry(extra.order_item_id.clone())
                .or_default()
                .push(extra.into_extra()?);
        }

        let mut items_by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for item in item_rows {
            let extras = extras_by_item.remove(&item.id).unwrap_or_default();
            items_by_order
                .entry(item.order_id.clone())
                .or_default()
                .push(item.into_item(extras)?);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn fetch_with(&self, mut qb: QueryBuilder<'_, Sqlite>) -> StoreResult<Vec<Order>> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&mut *tx).await?;
        let orders = Self::hydrate(&mut *tx, rows).await?;
        tx.commit().await?;
        Ok(orders)
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn fetch_active(&self, statuses: &[OrderStatus]) -> StoreResult<Vec<Order>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ("));
        let mut sep = qb.separated(", ");
        for status in statuses {
            sep.push_bind(status.as_str());
        }
        qb.push(") ORDER BY created_at DESC, id");
        self.fetch_with(qb).await
    }

    async fn fetch_by_date_range(
        &self,
        start_ms: i64,
        end_ms: i64,
        status: Option<OrderStatus>,
    ) -> StoreResult<Vec<Order>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE created_at >= "));
        qb.push_bind(start_ms);
        qb.push(" AND created_at <= ");
        qb.push_bind(end_ms);
        if let Some(status) = status {
            qb.push(" AND status = ");
            qb.push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at, id");
        self.fetch_with(qb).await
    }

    async fn find_by_id(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = "));
        qb.push_bind(order_id);
        Ok(self.fetch_with(qb).await?.into_iter().next())
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(order_id.to_string()));
        }
        Ok(())
    }

    async fn delete_extras(&self, order_id: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM order_item_extras WHERE order_item_id IN \
             (SELECT id FROM order_items WHERE order_id = ?)",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_items(&self, order_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_order_row(&self, order_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
