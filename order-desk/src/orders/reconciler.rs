//! Polling Reconciler
//!
//! Fetches the active orders on every tick, diffs them against the known-id
//! set and reports to listeners:
//!
//! - `on_refresh` fires on every successful tick, changed or not
//! - `on_new_orders` fires only when the differ found arrivals
//! - `on_error` fires on a failed fetch; known ids stay untouched

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::models::{Order, OrderStatus};
use tokio_util::sync::CancellationToken;

use super::differ::SnapshotDiffer;
use crate::core::poll_loop::{PollHandle, PollJob, RefreshTrigger, spawn_poll_loop};
use crate::store::{OrderStore, StoreError};

/// Consumer of reconciler events
#[async_trait]
pub trait ReconcilerListener: Send + Sync {
    /// Full active list after a successful tick
    async fn on_refresh(&self, orders: &[Order]);

    /// Orders that entered the active set since the previous tick
    async fn on_new_orders(&self, _arrived: &[Order]) {}

    /// A fetch failed; the next tick retries
    async fn on_error(&self, _error: &StoreError) {}
}

/// Reconciler configuration
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Tick interval
    pub interval: Duration,
    /// Statuses that make up the active set
    pub statuses: Vec<OrderStatus>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::live_board()
    }
}

impl ReconcilerConfig {
    /// Live order board: 3 s, every active status
    pub fn live_board() -> Self {
        Self {
            interval: Duration::from_secs(3),
            statuses: OrderStatus::ACTIVE.to_vec(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Refreshed { orders: usize, arrived: usize },
    Failed,
    /// Cancelled before results were applied
    Cancelled,
}

/// Order-board reconciler
pub struct PollingReconciler {
    store: Arc<dyn OrderStore>,
    config: ReconcilerConfig,
    differ: SnapshotDiffer,
    listeners: Vec<Arc<dyn ReconcilerListener>>,
    trigger: RefreshTrigger,
    consecutive_failures: u32,
}

impl PollingReconciler {
    pub fn new(store: Arc<dyn OrderStore>, config: ReconcilerConfig) -> Self {
        Self {
            store,
            config,
            differ: SnapshotDiffer::new(),
            listeners: Vec::new(),
            trigger: RefreshTrigger::new(),
            consecutive_failures: 0,
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ReconcilerListener>) {
        self.listeners.push(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn ReconcilerListener>) -> Self {
        self.add_listener(listener);
        self
    }

    /// Trigger wired to the loop once started; usable before `start()`
    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn differ(&self) -> &SnapshotDiffer {
        &self.differ
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run one reconcile cycle
    ///
    /// A fetch that completes after `shutdown` was cancelled is discarded.
    pub async fn tick(&mut self, shutdown: &CancellationToken) -> TickOutcome {
        let fetched = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return TickOutcome::Cancelled,
            result = self.store.fetch_active(&self.config.statuses) => result,
        };
        if shutdown.is_cancelled() {
            return TickOutcome::Cancelled;
        }

        let orders = match fetched {
            Ok(orders) => orders,
            Err(e) => {
                self.consecutive_failures += 1;
                tracing::warn!(
                    error = %e,
                    failures = self.consecutive_failures,
                    "Failed to fetch active orders, will retry next tick"
                );
                for listener in &self.listeners {
                    listener.on_error(&e).await;
                }
                return TickOutcome::Failed;
            }
        };

        if self.consecutive_failures > 0 {
            tracing::info!(
                failures = self.consecutive_failures,
                "Order store reachable again"
            );
            self.consecutive_failures = 0;
        }

        let diff = self.differ.apply(&orders);
        tracing::debug!(
            orders = orders.len(),
            arrived = diff.arrived.len(),
            departed = diff.departed.len(),
            "Reconciled active orders"
        );

        for listener in &self.listeners {
            listener.on_refresh(&orders).await;
        }

        if diff.has_arrivals() && !shutdown.is_cancelled() {
            tracing::info!(arrived = diff.arrived.len(), "New orders arrived");
            for listener in &self.listeners {
                listener.on_new_orders(&diff.arrived).await;
            }
        }

        TickOutcome::Refreshed {
            orders: orders.len(),
            arrived: diff.arrived.len(),
        }
    }

    /// Start ticking on the configured interval
    pub fn start(self) -> PollHandle {
        let interval = self.config.interval;
        let trigger = self.trigger.clone();
        spawn_poll_loop(self, interval, trigger)
    }
}

#[async_trait]
impl PollJob for PollingReconciler {
    fn name(&self) -> &'static str {
        "order_reconciler"
    }

    async fn run_tick(&mut self, shutdown: &CancellationToken) {
        self.tick(shutdown).await;
    }
}
