//! Notification Dispatcher
//!
//! Turns arrival batches into one notification per order. Only fires when
//! permission is granted; list refresh never depends on it.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{DiningTable, Order, OrderType};

use super::platform::{Notification, NotificationPermission, NotificationPlatform};
use crate::core::poll_loop::RefreshTrigger;
use crate::orders::ReconcilerListener;

/// Result of a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Number of notifications raised
    Sent(usize),
    /// Permission not granted; nothing raised
    Suppressed(NotificationPermission),
}

pub struct NotificationDispatcher {
    platform: Arc<dyn NotificationPlatform>,
    refresh: RefreshTrigger,
    currency: String,
}

impl NotificationDispatcher {
    pub fn new(platform: Arc<dyn NotificationPlatform>, refresh: RefreshTrigger) -> Self {
        Self {
            platform,
            refresh,
            currency: "R$".to_string(),
        }
    }

    pub fn with_currency(mut self, symbol: impl Into<String>) -> Self {
        self.currency = symbol.into();
        self
    }

    pub fn permission(&self) -> NotificationPermission {
        self.platform.permission()
    }

    /// Explicit, user-triggered permission request
    pub async fn request_permission(&self) -> NotificationPermission {
        let permission = self.platform.request_permission().await;
        tracing::info!(permission = %permission, "Notification permission requested");
        permission
    }

    /// Raise one notification per distinct arrived order
    pub async fn dispatch(&self, arrived: &[Order]) -> DispatchOutcome {
        let permission = self.platform.permission();
        if permission != NotificationPermission::Granted {
            tracing::debug!(
                permission = %permission,
                arrived = arrived.len(),
                "Notifications suppressed"
            );
            return DispatchOutcome::Suppressed(permission);
        }

        let mut sent = 0;
        for order in arrived {
            match self.platform.raise(self.build(order)).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Failed to raise notification")
                }
            }
        }
        DispatchOutcome::Sent(sent)
    }

    /// Notification content for one order
    pub fn build(&self, order: &Order) -> Notification {
        let items = item_count_label(order.item_count());
        let total = self.money(order.total);
        let customer = order
            .customer_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Customer");

        let (title, body) = match order.order_type {
            OrderType::Delivery => (
                "New delivery order".to_string(),
                format!("{} · {} · {}", customer, items, total),
            ),
            OrderType::DineIn => (
                format!("New order · {}", DiningTable::label(order.table_number)),
                format!("{} · {}", items, total),
            ),
            OrderType::Pickup => (
                "New pickup order".to_string(),
                format!("{} · {} · {}", customer, items, total),
            ),
        };

        let refresh = self.refresh.clone();
        Notification {
            title,
            body,
            tag: format!("order-{}", order.id),
            on_click: Some(Arc::new(move || refresh.force())),
        }
    }

    fn money(&self, amount: Decimal) -> String {
        format!("{} {:.2}", self.currency, amount.round_dp(2))
    }
}

fn item_count_label(count: i32) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

#[async_trait]
impl ReconcilerListener for NotificationDispatcher {
    async fn on_refresh(&self, _orders: &[Order]) {}

    async fn on_new_orders(&self, arrived: &[Order]) {
        if let DispatchOutcome::Sent(n) = self.dispatch(arrived).await {
            tracing::debug!(sent = n, "Arrival notifications raised");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::platform::LogNotificationPlatform;
    use shared::models::{OrderItem, OrderStatus};
    use std::str::FromStr;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn item(quantity: i32) -> OrderItem {
        OrderItem {
            id: "i".into(),
            product_name: "X-Burger".into(),
            quantity,
            unit_price: d("10"),
            subtotal: d("10") * Decimal::from(quantity),
            variety: None,
            notes: None,
            extras: vec![],
        }
    }

    fn order(id: &str, order_type: OrderType, table: i32, items: Vec<OrderItem>) -> Order {
        Order {
            id: id.into(),
            order_type,
            table_number: table,
            status: OrderStatus::Pending,
            total: d("45.9"),
            customer_name: Some("Ana".into()),
            customer_phone: None,
            delivery_address: Some("Rua A, 10".into()),
            delivery_fee: Decimal::ZERO,
            notes: None,
            created_at: 0,
            items,
        }
    }

    fn setup(permission: NotificationPermission) -> (Arc<LogNotificationPlatform>, NotificationDispatcher) {
        let platform = Arc::new(LogNotificationPlatform::new(permission));
        let dispatcher = NotificationDispatcher::new(platform.clone(), RefreshTrigger::new());
        (platform, dispatcher)
    }

    #[test]
    fn test_delivery_content() {
        let (_, dispatcher) = setup(NotificationPermission::Granted);
        let n = dispatcher.build(&order("o1", OrderType::Delivery, 0, vec![item(2), item(1)]));
        assert_eq!(n.title, "New delivery order");
        assert_eq!(n.body, "Ana · 3 items · R$ 45.90");
        assert_eq!(n.tag, "order-o1");
    }

    #[test]
    fn test_dine_in_content() {
        let (_, dispatcher) = setup(NotificationPermission::Granted);
        let n = dispatcher.build(&order("o2", OrderType::DineIn, 7, vec![item(1)]));
        assert_eq!(n.title, "New order · Table 7");
        assert_eq!(n.body, "1 item · R$ 45.90");

        let n = dispatcher.build(&order("o3", OrderType::DineIn, 0, vec![item(1)]));
        assert_eq!(n.title, "New order · Counter");
    }

    #[test]
    fn test_currency_symbol() {
        let (_, dispatcher) = setup(NotificationPermission::Granted);
        let dispatcher = dispatcher.with_currency("€");
        let n = dispatcher.build(&order("o4", OrderType::Pickup, 0, vec![item(1)]));
        assert_eq!(n.body, "Ana · 1 item · € 45.90");
    }

    #[tokio::test]
    async fn test_one_notification_per_order() {
        let (platform, dispatcher) = setup(NotificationPermission::Granted);
        let arrived = vec![
            order("a", OrderType::Delivery, 0, vec![item(1)]),
            order("b", OrderType::DineIn, 3, vec![item(2)]),
        ];
        assert_eq!(dispatcher.dispatch(&arrived).await, DispatchOutcome::Sent(2));
        assert_eq!(platform.recent().len(), 2);
    }

    #[tokio::test]
    async fn test_suppressed_without_grant() {
        for permission in [NotificationPermission::Default, NotificationPermission::Denied] {
            let (platform, dispatcher) = setup(permission);
            let arrived = vec![order("a", OrderType::Pickup, 0, vec![item(1)])];
            assert_eq!(
                dispatcher.dispatch(&arrived).await,
                DispatchOutcome::Suppressed(permission)
            );
            assert!(platform.recent().is_empty());
        }
    }

    #[tokio::test]
    async fn test_permission_is_never_requested_implicitly() {
        let (platform, dispatcher) = setup(NotificationPermission::Default);
        dispatcher
            .dispatch(&[order("a", OrderType::Pickup, 0, vec![item(1)])])
            .await;
        assert_eq!(platform.permission(), NotificationPermission::Default);

        assert_eq!(dispatcher.request_permission().await, NotificationPermission::Granted);
        assert_eq!(
            dispatcher
                .dispatch(&[order("a", OrderType::Pickup, 0, vec![item(1)])])
                .await,
            DispatchOutcome::Sent(1)
        );
    }
}
