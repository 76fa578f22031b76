//! Order Service
//!
//! Structural operations on single orders. Errors propagate to the caller;
//! nothing here is retried.

use std::sync::Arc;

use shared::error::{AppError, AppResult};
use shared::models::{Order, OrderStatus};

use crate::store::OrderStore;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, order_id: &str) -> AppResult<Order> {
        self.store
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::order_not_found(order_id))
    }

    /// Orders currently on the board (pending → out_for_delivery), newest first
    pub async fn active_orders(&self) -> AppResult<Vec<Order>> {
        Ok(self.store.fetch_active(&OrderStatus::ACTIVE).await?)
    }

    /// Move an order to `next`
    ///
    /// Fails with `OrderNotFound` for unknown ids and
    /// `InvalidStatusTransition` when the lifecycle forbids the move.
    pub async fn update_status(&self, order_id: &str, next: OrderStatus) -> AppResult<Order> {
        let mut order = self.find(order_id).await?;

        if !order.status.can_transition_to(next, order.order_type) {
            tracing::warn!(
                order_id = %order_id,
                from = %order.status,
                to = %next,
                "Rejected status transition"
            );
            return Err(AppError::invalid_transition(
                order.status.as_str(),
                next.as_str(),
            ));
        }

        self.store.update_status(order_id, next).await?;
        tracing::info!(order_id = %order_id, from = %order.status, to = %next, "Order status updated");

        order.status = next;
        Ok(order)
    }

    /// Cascade delete (extras → items → order)
    ///
    /// A `PartialDeleteFailure` carries `order_id` and `stage` details; the
    /// order is still readable and the delete can be retried.
    pub async fn delete_order(&self, order_id: &str) -> AppResult<()> {
        self.store.delete_order(order_id).await.map_err(|e| {
            let err = AppError::from(e);
            tracing::error!(order_id = %order_id, code = %err.code, "Order delete failed: {}", err.message);
            err
        })
    }
}
