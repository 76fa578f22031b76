//! Dashboard Service
//!
//! Resolves the requested range, pulls the orders it needs from the store and
//! hands them to the aggregator.

use std::sync::Arc;

use shared::error::AppResult;
use shared::models::OrderStatus;

use super::aggregator::{DashboardAggregator, DashboardStats};
use super::range::{DateRange, TimeRange};
use crate::store::OrderStore;
use crate::utils::Clock;

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    aggregator: DashboardAggregator,
}

impl DashboardService {
    pub fn new(store: Arc<dyn OrderStore>, clock: Arc<dyn Clock>, tz: chrono_tz::Tz) -> Self {
        Self {
            store,
            clock,
            aggregator: DashboardAggregator::new(tz),
        }
    }

    pub fn aggregator(&self) -> &DashboardAggregator {
        &self.aggregator
    }

    /// Compute fresh statistics for `range`
    ///
    /// Range errors surface as `InvalidRange` without any store access.
    pub async fn stats(&self, range: &TimeRange) -> AppResult<DashboardStats> {
        let tz = self.aggregator.timezone();
        let today = self.clock.now_in(tz).date_naive();
        let resolved = range.resolve(today)?;

        let (start, end) = resolved.bounds_millis(tz);
        let range_orders = self.store.fetch_by_date_range(start, end, None).await?;
        let active_orders = self.store.fetch_active(&OrderStatus::ACTIVE).await?;

        let today_orders = if resolved.contains(today) {
            range_orders.clone()
        } else {
            let (start, end) = DateRange::single(today).bounds_millis(tz);
            self.store.fetch_by_date_range(start, end, None).await?
        };

        let stats = self.aggregator.compute(
            resolved,
            &range_orders,
            &active_orders,
            &today_orders,
            today,
        );
        tracing::debug!(
            start = %resolved.start(),
            end = %resolved.end(),
            orders = range_orders.len(),
            revenue = %stats.revenue,
            "Dashboard statistics computed"
        );
        Ok(stats)
    }
}
