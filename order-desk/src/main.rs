use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use order_desk::dashboard::{DashboardListener, DashboardService, DashboardStats, DashboardWatcher, TimeRange};
use order_desk::notify::{LogNotificationPlatform, NotificationDispatcher};
use order_desk::orders::{PollingReconciler, ReconcilerConfig, ReconcilerListener};
use order_desk::store::{OrderStore, SqliteOrderStore};
use order_desk::utils::{Clock, SystemClock};
use order_desk::{OpeningHoursEvaluator, setup_environment};
use shared::models::{Order, OrderStatus};

/// Logs the board whenever the active set changes size
#[derive(Default)]
struct BoardLog {
    last: parking_lot::Mutex<Option<usize>>,
}

#[async_trait]
impl ReconcilerListener for BoardLog {
    async fn on_refresh(&self, orders: &[Order]) {
        let mut last = self.last.lock();
        if *last == Some(orders.len()) {
            return;
        }
        *last = Some(orders.len());

        let count = |s: OrderStatus| orders.iter().filter(|o| o.status == s).count();
        tracing::info!(
            active = orders.len(),
            pending = count(OrderStatus::Pending),
            preparing = count(OrderStatus::Preparing),
            ready = count(OrderStatus::Ready),
            out_for_delivery = count(OrderStatus::OutForDelivery),
            "Order board updated"
        );
    }
}

struct DashboardLog;

#[async_trait]
impl DashboardListener for DashboardLog {
    async fn on_stats(&self, stats: &DashboardStats) {
        tracing::info!(
            revenue = %stats.revenue,
            delivered = stats.delivered_orders,
            active = stats.active_orders,
            counter_orders = stats.today.counter_orders,
            deliveries = stats.today.deliveries,
            "Today's dashboard"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (dotenv, 配置, 日志)
    let config = setup_environment();
    tracing::info!(environment = %config.environment, "🍽️ Order desk starting...");

    // 2. 餐厅设置 / 营业时间
    let settings = config.load_settings().context("loading restaurant settings")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hours = OpeningHoursEvaluator::new(
        settings.opening_hours.clone(),
        config.timezone,
        clock.clone(),
    );
    if !hours.is_configured() {
        tracing::warn!("No opening hours configured, treating the restaurant as open");
    }
    tracing::info!(open = hours.is_open_now(), timezone = %config.timezone, "Opening hours evaluated");

    // 3. 订单库
    let store: Arc<dyn OrderStore> = Arc::new(
        SqliteOrderStore::open(&config.database_path)
            .await
            .context("opening order database")?,
    );

    // 4. 订单看板 + 通知
    let mut reconciler = PollingReconciler::new(
        store.clone(),
        ReconcilerConfig::live_board().with_interval(config.live_poll_interval()),
    );
    let platform = Arc::new(LogNotificationPlatform::new(config.notification_permission));
    let dispatcher = NotificationDispatcher::new(platform, reconciler.refresh_trigger())
        .with_currency(settings.currency_symbol.clone());
    tracing::info!(permission = %dispatcher.permission(), "Notification platform ready");
    reconciler.add_listener(Arc::new(dispatcher));
    reconciler.add_listener(Arc::new(BoardLog::default()));
    let board = reconciler.start();

    // 5. 仪表盘
    let dashboard = DashboardWatcher::new(
        DashboardService::new(store, clock, config.timezone),
        TimeRange::Today,
        Arc::new(DashboardLog),
    )
    .start(config.dashboard_poll_interval());

    // 6. 等待退出信号
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    board.stop().await;
    dashboard.stop().await;
    tracing::info!("Order desk stopped");
    Ok(())
}
