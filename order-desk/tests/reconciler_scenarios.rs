mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Recorder, order};
use order_desk::notify::{LogNotificationPlatform, NotificationDispatcher, NotificationPermission};
use order_desk::orders::{PollingReconciler, ReconcilerConfig, TickOutcome};
use order_desk::store::MemoryOrderStore;
use shared::models::OrderStatus;
use tokio_util::sync::CancellationToken;

fn reconciler(store: &Arc<MemoryOrderStore>, recorder: &Arc<Recorder>) -> PollingReconciler {
    PollingReconciler::new(store.clone(), ReconcilerConfig::live_board())
        .with_listener(recorder.clone())
}

// ========================================================================
// Direct ticks
// ========================================================================

#[tokio::test]
async fn new_order_between_ticks_is_reported_alone() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1), order("B", 2)]));
    let recorder = Arc::new(Recorder::default());
    let mut reconciler = reconciler(&store, &recorder);
    let token = CancellationToken::new();

    reconciler.tick(&token).await;
    assert!(recorder.arrivals().is_empty());

    store.insert(order("C", 3));
    let outcome = reconciler.tick(&token).await;

    assert_eq!(outcome, TickOutcome::Refreshed { orders: 3, arrived: 1 });
    assert_eq!(recorder.arrivals(), vec![vec!["C".to_string()]]);
    assert_eq!(
        recorder.last_refresh().unwrap(),
        vec!["C".to_string(), "B".to_string(), "A".to_string()]
    );
}

#[tokio::test]
async fn emptied_board_still_refreshes_and_reentry_is_new() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1), order("B", 2)]));
    let recorder = Arc::new(Recorder::default());
    let mut reconciler = reconciler(&store, &recorder);
    let token = CancellationToken::new();

    reconciler.tick(&token).await;

    store.set_status("A", OrderStatus::Delivered);
    store.set_status("B", OrderStatus::Delivered);
    reconciler.tick(&token).await;
    assert_eq!(recorder.refresh_count(), 2);
    assert_eq!(recorder.last_refresh().unwrap(), Vec::<String>::new());
    assert!(recorder.arrivals().is_empty());

    store.set_status("A", OrderStatus::Preparing);
    reconciler.tick(&token).await;
    assert_eq!(recorder.arrivals(), vec![vec!["A".to_string()]]);
}

#[tokio::test]
async fn status_change_within_active_set_is_not_an_arrival() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    let recorder = Arc::new(Recorder::default());
    let mut reconciler = reconciler(&store, &recorder);
    let token = CancellationToken::new();

    reconciler.tick(&token).await;
    store.set_status("A", OrderStatus::Ready);
    reconciler.tick(&token).await;

    assert!(recorder.arrivals().is_empty());
    assert_eq!(recorder.refresh_count(), 2);
}

#[tokio::test]
async fn fetch_failure_does_not_fire_spurious_arrivals() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1), order("B", 2)]));
    let recorder = Arc::new(Recorder::default());
    let mut reconciler = reconciler(&store, &recorder);
    let token = CancellationToken::new();

    reconciler.tick(&token).await;
    store.fail_next_fetches(2);
    assert_eq!(reconciler.tick(&token).await, TickOutcome::Failed);
    assert_eq!(reconciler.tick(&token).await, TickOutcome::Failed);
    assert_eq!(recorder.errors.lock().len(), 2);

    reconciler.tick(&token).await;
    assert!(recorder.arrivals().is_empty());
    assert_eq!(recorder.refresh_count(), 2);
}

// ========================================================================
// Running loop (paused clock)
// ========================================================================

#[tokio::test(start_paused = true)]
async fn running_loop_reports_arrivals_each_interval() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    let recorder = Arc::new(Recorder::default());
    let handle = reconciler(&store, &recorder).start();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(recorder.refresh_count(), 1);

    store.insert(order("B", 2));
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(recorder.refresh_count(), 2);
    assert_eq!(recorder.arrivals(), vec![vec!["B".to_string()]]);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_callbacks_after_stop() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    let recorder = Arc::new(Recorder::default());
    let handle = reconciler(&store, &recorder).start();

    tokio::time::sleep(Duration::from_millis(10)).await;
    handle.stop().await;
    let refreshes = recorder.refresh_count();

    store.insert(order("B", 2));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(recorder.refresh_count(), refreshes);
    assert!(recorder.arrivals().is_empty());
}

#[tokio::test(start_paused = true)]
async fn in_flight_fetch_is_discarded_on_stop() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    store.set_fetch_delay(Some(Duration::from_secs(2)));
    let recorder = Arc::new(Recorder::default());
    let handle = reconciler(&store, &recorder).start();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(store.current_fetches(), 1);
    handle.stop().await;
    assert_eq!(store.current_fetches(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.refresh_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_store_never_sees_overlapping_fetches() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    store.set_fetch_delay(Some(Duration::from_secs(5)));
    let recorder = Arc::new(Recorder::default());
    let handle = reconciler(&store, &recorder).start();

    tokio::time::sleep(Duration::from_secs(21)).await;
    handle.stop().await;

    assert_eq!(store.max_concurrent_fetches(), 1);
    assert_eq!(recorder.refresh_count(), 4); // completes at 5, 10, 15, 20
}

#[tokio::test(start_paused = true)]
async fn notification_click_refreshes_a_paused_board() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    let recorder = Arc::new(Recorder::default());
    let platform = Arc::new(LogNotificationPlatform::new(NotificationPermission::Granted));

    let mut reconciler = reconciler(&store, &recorder);
    let dispatcher = NotificationDispatcher::new(platform.clone(), reconciler.refresh_trigger());
    reconciler.add_listener(Arc::new(dispatcher));
    let handle = reconciler.start();

    tokio::time::sleep(Duration::from_millis(10)).await;
    store.insert(order("B", 2));
    tokio::time::sleep(Duration::from_secs(3)).await;

    let raised: Vec<String> = platform.recent().into_iter().map(|n| n.tag).collect();
    assert_eq!(raised, vec!["order-B".to_string()]);

    // window goes to the background
    handle.pause();
    let before = recorder.refresh_count();
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(recorder.refresh_count(), before);

    assert!(platform.click("order-B"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(recorder.refresh_count(), before + 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn denied_permission_still_refreshes_the_list() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    let recorder = Arc::new(Recorder::default());
    let platform = Arc::new(LogNotificationPlatform::new(NotificationPermission::Denied));

    let mut reconciler = reconciler(&store, &recorder);
    let dispatcher = NotificationDispatcher::new(platform.clone(), reconciler.refresh_trigger());
    reconciler.add_listener(Arc::new(dispatcher));
    let handle = reconciler.start();

    tokio::time::sleep(Duration::from_millis(10)).await;
    store.insert(order("B", 2));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(platform.recent().is_empty());
    assert_eq!(recorder.arrivals(), vec![vec!["B".to_string()]]);
    assert_eq!(recorder.last_refresh().unwrap().len(), 2);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn click_during_slow_fetch_refreshes_again_afterwards() {
    let store = Arc::new(MemoryOrderStore::with_orders([order("A", 1)]));
    let recorder = Arc::new(Recorder::default());
    let platform = Arc::new(LogNotificationPlatform::new(NotificationPermission::Granted));

    let mut reconciler = reconciler(&store, &recorder);
    let dispatcher = NotificationDispatcher::new(platform.clone(), reconciler.refresh_trigger());
    reconciler.add_listener(Arc::new(dispatcher));
    let handle = reconciler.start();

    tokio::time::sleep(Duration::from_millis(10)).await;
    store.insert(order("B", 2));
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(platform.recent().len(), 1);

    handle.pause();
    store.set_fetch_delay(Some(Duration::from_secs(2)));
    let before = recorder.refresh_count();
    assert!(handle.refresh_trigger().trigger());

    // the running fetch started before the click
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(handle.refresh_trigger().is_in_flight());
    assert!(platform.click("order-B"));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(recorder.refresh_count(), before + 2);

    handle.stop().await;
}
