//! Order Store
//!
//! Persistence boundary for orders. The core only reads active orders, reads
//! by date range, updates a single status field and cascade-deletes.
//!
//! - [`SqliteOrderStore`] - SQLite (sqlx) backed store
//! - [`MemoryOrderStore`] - in-process store with fault injection

mod memory;
mod sqlite;

pub use memory::MemoryOrderStore;
pub use sqlite::SqliteOrderStore;

use std::fmt;

use async_trait::async_trait;
use shared::error::AppError;
use shared::models::{Order, OrderStatus};
use thiserror::Error;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or query failed; transient
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    /// Cascade delete stopped after an earlier stage had already committed
    #[error("Order {order_id} partially deleted: {stage} step failed: {reason}")]
    PartialDelete {
        order_id: String,
        stage: DeleteStage,
        reason: String,
    },

    /// Stored row could not be mapped back to a model
    #[error("Corrupted row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::store_unavailable(msg),
            StoreError::NotFound(id) => AppError::order_not_found(id),
            StoreError::PartialDelete {
                order_id,
                stage,
                reason,
            } => AppError::partial_delete(order_id, stage.as_str(), reason),
            StoreError::Decode(msg) => {
                AppError::with_message(shared::ErrorCode::StorageCorrupted, msg)
            }
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Cascade delete stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStage {
    Extras,
    Items,
    Order,
}

impl DeleteStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeleteStage::Extras => "extras",
            DeleteStage::Items => "items",
            DeleteStage::Order => "order",
        }
    }
}

impl fmt::Display for DeleteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order persistence contract
///
/// Implementations are shared across tasks (`Arc<dyn OrderStore>`).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders whose status is in `statuses`, newest first
    async fn fetch_active(&self, statuses: &[OrderStatus]) -> StoreResult<Vec<Order>>;

    /// Orders created within `[start_ms, end_ms]` (both inclusive),
    /// optionally restricted to one status, oldest first
    async fn fetch_by_date_range(
        &self,
        start_ms: i64,
        end_ms: i64,
        status: Option<OrderStatus>,
    ) -> StoreResult<Vec<Order>>;

    async fn find_by_id(&self, order_id: &str) -> StoreResult<Option<Order>>;

    /// Set the status column. `NotFound` when no row matched.
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()>;

    // ---- cascade delete stages ----

    /// Delete all extras of the order's items, returns rows removed
    async fn delete_extras(&self, order_id: &str) -> StoreResult<u64>;

    /// Delete all items of the order, returns rows removed
    async fn delete_items(&self, order_id: &str) -> StoreResult<u64>;

    /// Delete the order row itself, `false` when it was already gone
    async fn delete_order_row(&self, order_id: &str) -> StoreResult<bool>;

    /// Cascade delete: extras → items → order
    ///
    /// A failure in the first stage leaves nothing changed and is returned
    /// as-is. A failure in a later stage is reported as
    /// [`StoreError::PartialDelete`]; the order row is still present.
    async fn delete_order(&self, order_id: &str) -> StoreResult<()> {
        if self.find_by_id(order_id).await?.is_none() {
            return Err(StoreError::NotFound(order_id.to_string()));
        }

        let extras = self.delete_extras(order_id).await?;

        let items = self.delete_items(order_id).await.map_err(|e| {
            tracing::error!(order_id = %order_id, error = %e, "Cascade delete failed at items stage");
            StoreError::PartialDelete {
                order_id: order_id.to_string(),
                stage: DeleteStage::Items,
                reason: e.to_string(),
            }
        })?;

        match self.delete_order_row(order_id).await {
            Ok(true) => {
                tracing::info!(order_id = %order_id, extras, items, "Order deleted");
                Ok(())
            }
            Ok(false) => Err(StoreError::NotFound(order_id.to_string())),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Cascade delete failed at order stage");
                Err(StoreError::PartialDelete {
                    order_id: order_id.to_string(),
                    stage: DeleteStage::Order,
                    reason: e.to_string(),
                })
            }
        }
    }
}
