//! In-process order store
//!
//! Keeps orders in a map behind a `parking_lot` mutex. Faults can be injected
//! per operation so callers can exercise the failure paths of the core.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::error::AppResult;
use shared::models::{Order, OrderCreate, OrderStatus};

use super::{DeleteStage, OrderStore, StoreError, StoreResult};

#[derive(Default)]
struct Faults {
    /// Remaining fetches that fail with `Unavailable`
    failing_fetches: u32,
    /// Cascade delete stage that fails with `Unavailable`
    failing_stage: Option<DeleteStage>,
    /// Artificial latency on `fetch_active`
    fetch_delay: Option<Duration>,
}

/// In-memory [`OrderStore`]
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<String, Order>>,
    faults: Mutex<Faults>,
    fetch_count: AtomicU64,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        for order in orders {
            store.insert(order);
        }
        store
    }

    /// Insert or replace an order snapshot
    pub fn insert(&self, order: Order) {
        self.orders.lock().insert(order.id.clone(), order);
    }

    /// Checkout entry point
    pub fn create_order(&self, input: OrderCreate, created_at: i64) -> AppResult<Order> {
        let order = Order::from_create(input, created_at)?;
        self.insert(order.clone());
        Ok(order)
    }

    /// Overwrite a status without lifecycle checks
    pub fn set_status(&self, order_id: &str, status: OrderStatus) {
        if let Some(order) = self.orders.lock().get_mut(order_id) {
            order.status = status;
        }
    }

    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.lock().get(order_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.lock().is_empty()
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    /// Make the next `n` calls to `fetch_active` / `fetch_by_date_range` fail
    pub fn fail_next_fetches(&self, n: u32) {
        self.faults.lock().failing_fetches = n;
    }

    /// Make one cascade delete stage fail until cleared
    pub fn fail_delete_stage(&self, stage: Option<DeleteStage>) {
        self.faults.lock().failing_stage = stage;
    }

    /// Delay every `fetch_active` call
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.faults.lock().fetch_delay = delay;
    }

    /// Number of fetch calls made so far (successful or not)
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// `fetch_active` calls running right now
    pub fn current_fetches(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently running `fetch_active` calls
    pub fn max_concurrent_fetches(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check_fetch_fault(&self) -> StoreResult<()> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock();
        if faults.failing_fetches > 0 {
            faults.failing_fetches -= 1;
            return Err(StoreError::Unavailable("injected fetch failure".into()));
        }
        Ok(())
    }

    fn check_stage_fault(&self, stage: DeleteStage) -> StoreResult<()> {
        if self.faults.lock().failing_stage == Some(stage) {
            return Err(StoreError::Unavailable(format!(
                "injected failure deleting {}",
                stage
            )));
        }
        Ok(())
    }
}

/// Counts a running fetch until dropped, including when the fetch is cancelled
struct InFlight<'a>(&'a AtomicU32);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicU32, max: &AtomicU32) -> Self {
        let running = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(running, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn fetch_active(&self, statuses: &[OrderStatus]) -> StoreResult<Vec<Order>> {
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);

        let delay = self.faults.lock().fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_fetch_fault().map(|()| {
            let mut orders: Vec<Order> = self
                .orders
                .lock()
                .values()
                .filter(|o| statuses.contains(&o.status))
                .cloned()
                .collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            orders
        })
    }

    async fn fetch_by_date_range(
        &self,
        start_ms: i64,
        end_ms: i64,
        status: Option<OrderStatus>,
    ) -> StoreResult<Vec<Order>> {
        self.check_fetch_fault()?;
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .values()
            .filter(|o| o.created_at >= start_ms && o.created_at <= end_ms)
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn find_by_id(&self, order_id: &str) -> StoreResult<Option<Order>> {
        Ok(self.get(order_id))
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()> {
        match self.orders.lock().get_mut(order_id) {
            Some(order) => {
                order.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(order_id.to_string())),
        }
    }

    async fn delete_extras(&self, order_id: &str) -> StoreResult<u64> {
        self.check_stage_fault(DeleteStage::Extras)?;
        let mut orders = self.orders.lock();
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(0);
        };
        let mut removed = 0;
        for item in &mut order.items {
            removed += item.extras.len() as u64;
            item.extras.clear();
        }
        Ok(removed)
    }

    async fn delete_items(&self, order_id: &str) -> StoreResult<u64> {
        self.check_stage_fault(DeleteStage::Items)?;
        let mut orders = self.orders.lock();
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(0);
        };
        let removed = order.items.len() as u64;
        order.items.clear();
        Ok(removed)
    }

    async fn delete_order_row(&self, order_id: &str) -> StoreResult<bool> {
        self.check_stage_fault(DeleteStage::Order)?;
        Ok(self.orders.lock().remove(order_id).is_some())
    }
}
