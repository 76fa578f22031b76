//! Dashboard Watcher
//!
//! Recomputes statistics on every tick (30 s by default) and pushes them to a
//! listener.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::error::AppError;
use tokio_util::sync::CancellationToken;

use super::aggregator::DashboardStats;
use super::range::TimeRange;
use super::service::DashboardService;
use crate::core::poll_loop::{PollHandle, PollJob, RefreshTrigger, spawn_poll_loop};

#[async_trait]
pub trait DashboardListener: Send + Sync {
    async fn on_stats(&self, stats: &DashboardStats);

    async fn on_error(&self, _error: &AppError) {}
}

pub struct DashboardWatcher {
    service: DashboardService,
    range: TimeRange,
    listener: Arc<dyn DashboardListener>,
    trigger: RefreshTrigger,
}

impl DashboardWatcher {
    pub fn new(
        service: DashboardService,
        range: TimeRange,
        listener: Arc<dyn DashboardListener>,
    ) -> Self {
        Self {
            service,
            range,
            listener,
            trigger: RefreshTrigger::new(),
        }
    }

    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    pub fn start(self, interval: Duration) -> PollHandle {
        let trigger = self.trigger.clone();
        spawn_poll_loop(self, interval, trigger)
    }
}

#[async_trait]
impl PollJob for DashboardWatcher {
    fn name(&self) -> &'static str {
        "dashboard_watcher"
    }

    async fn run_tick(&mut self, shutdown: &CancellationToken) {
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            result = self.service.stats(&self.range) => result,
        };
        if shutdown.is_cancelled() {
            return;
        }

        match result {
            Ok(stats) => self.listener.on_stats(&stats).await,
            Err(e) => {
                tracing::warn!(code = %e.code, "Dashboard refresh failed: {}", e.message);
                self.listener.on_error(&e).await;
            }
        }
    }
}
