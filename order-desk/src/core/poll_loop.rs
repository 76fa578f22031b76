//! 轮询循环
//!
//! 订单看板 (3s) 和仪表盘 (30s) 共用的定时循环：
//!
//! - 同一时刻最多一个 tick 在执行，执行期间错过的定时触发合并为一次，不排队
//! - 暂停 (界面不可见) 时跳过定时触发，手动刷新仍然生效
//! - `stop()` 返回后不会再有任何回调

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Shortest interval a loop will run at
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One unit of periodic work
#[async_trait]
pub trait PollJob: Send + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run a single tick. Must not report results once `shutdown` is cancelled.
    async fn run_tick(&mut self, shutdown: &CancellationToken);
}

// ============================================================================
// RefreshTrigger
// ============================================================================

#[derive(Default)]
struct TriggerState {
    notify: Notify,
    in_flight: AtomicBool,
}

/// Manual refresh handle (notification click, pull-to-refresh)
///
/// Cheap to clone. [`trigger`](Self::trigger) is dropped while a tick is
/// running; [`force`](Self::force) queues one tick after it instead.
#[derive(Clone, Default)]
pub struct RefreshTrigger {
    state: Arc<TriggerState>,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an immediate tick. Returns `false` when dropped.
    pub fn trigger(&self) -> bool {
        if self.state.in_flight.load(Ordering::SeqCst) {
            tracing::debug!("Refresh requested while a tick is in flight, dropped");
            return false;
        }
        self.state.notify.notify_one();
        true
    }

    /// Request a tick even if one is running
    ///
    /// The in-flight fetch may predate the request, so one more tick runs
    /// right after it. Repeated calls coalesce into a single pending tick.
    pub fn force(&self) {
        self.state.notify.notify_one();
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    fn set_in_flight(&self, value: bool) {
        self.state.in_flight.store(value, Ordering::SeqCst);
    }

    async fn notified(&self) {
        self.state.notify.notified().await;
    }
}

// ============================================================================
// PollHandle
// ============================================================================

/// Handle to a running poll loop
///
/// Dropping the handle cancels the loop without waiting for it.
pub struct PollHandle {
    name: &'static str,
    shutdown: CancellationToken,
    paused: Arc<AtomicBool>,
    trigger: RefreshTrigger,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Skip timer ticks until [`resume`](Self::resume)
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            tracing::debug!(task = %self.name, "Polling paused");
        }
    }

    /// Resume timer ticks and refresh right away
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            tracing::debug!(task = %self.name, "Polling resumed");
            self.trigger.trigger();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Cancel the loop and wait for it to exit
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(()) => tracing::debug!(task = %self.name, "Poll loop stopped"),
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(task = %self.name, "Poll loop cancelled")
                }
                Err(e) => tracing::error!(task = %self.name, error = ?e, "Poll loop join failed"),
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ============================================================================
// Loop
// ============================================================================

/// Spawn a poll loop driving `job` every `interval`
///
/// The first tick runs immediately. Intervals below [`MIN_POLL_INTERVAL`]
/// are raised to it.
pub fn spawn_poll_loop<J: PollJob>(
    mut job: J,
    interval: Duration,
    trigger: RefreshTrigger,
) -> PollHandle {
    let name = job.name();
    if interval < MIN_POLL_INTERVAL {
        tracing::warn!(
            task = %name,
            requested_ms = interval.as_millis() as u64,
            "Poll interval too short, using {}ms",
            MIN_POLL_INTERVAL.as_millis()
        );
    }
    let interval = interval.max(MIN_POLL_INTERVAL);
    let shutdown = CancellationToken::new();
    let paused = Arc::new(AtomicBool::new(false));

    let loop_shutdown = shutdown.clone();
    let loop_paused = paused.clone();
    let loop_trigger = trigger.clone();

    let body = async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(task = %name, interval_ms = interval.as_millis() as u64, "Poll loop started");

        loop {
            tokio::select! {
                biased;
                _ = loop_shutdown.cancelled() => break,
                _ = loop_trigger.notified() => {
                    tracing::debug!(task = %name, "Manual refresh");
                    ticker.reset();
                }
                _ = ticker.tick() => {
                    if loop_paused.load(Ordering::SeqCst) {
                        continue;
                    }
                }
            }

            loop_trigger.set_in_flight(true);
            tokio::select! {
                biased;
                _ = loop_shutdown.cancelled() => {
                    loop_trigger.set_in_flight(false);
                    break;
                }
                _ = job.run_tick(&loop_shutdown) => {}
            }
            loop_trigger.set_in_flight(false);
        }
    };

    let wrapped = async move {
        if let Err(panic_info) = AssertUnwindSafe(body).catch_unwind().await {
            let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            tracing::error!(task = %name, panic = %panic_msg, "Poll loop panicked");
        }
    };

    PollHandle {
        name,
        shutdown,
        paused,
        trigger,
        task: Some(tokio::spawn(wrapped)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct CountingJob {
        ticks: Arc<AtomicU32>,
        work: Duration,
    }

    #[async_trait]
    impl PollJob for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_tick(&mut self, _shutdown: &CancellationToken) {
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(work: Duration) -> (CountingJob, Arc<AtomicU32>) {
        let ticks = Arc::new(AtomicU32::new(0));
        (
            CountingJob {
                ticks: ticks.clone(),
                work,
            },
            ticks,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_interval() {
        let (job, ticks) = counting(Duration::ZERO);
        let handle = spawn_poll_loop(job, Duration::from_secs(3), RefreshTrigger::new());

        tokio::time::sleep(Duration::from_millis(6_010)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3); // t = 0, 3s, 6s

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let (job, ticks) = counting(Duration::ZERO);
        let handle = spawn_poll_loop(job, Duration::from_secs(3), RefreshTrigger::new());

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop().await;
        let after_stop = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_in_flight_tick() {
        let (job, ticks) = counting(Duration::from_secs(2));
        let handle = spawn_poll_loop(job, Duration::from_secs(3), RefreshTrigger::new());

        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.stop().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_skips_timer_and_resume_refreshes() {
        let (job, ticks) = counting(Duration::ZERO);
        let handle = spawn_poll_loop(job, Duration::from_secs(3), RefreshTrigger::new());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        handle.pause();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        handle.resume();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_bypasses_pause() {
        let (job, ticks) = counting(Duration::ZERO);
        let handle = spawn_poll_loop(job, Duration::from_secs(3), RefreshTrigger::new());
        tokio::time::sleep(Duration::from_millis(10)).await;

        handle.pause();
        assert!(handle.refresh_trigger().trigger());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(handle.is_paused());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_during_tick_is_dropped() {
        let (job, ticks) = counting(Duration::from_secs(1));
        let trigger = RefreshTrigger::new();
        let handle = spawn_poll_loop(job, Duration::from_secs(3), trigger.clone());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(trigger.is_in_flight());
        assert!(!trigger.trigger());

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_refresh_during_tick_runs_after_it() {
        let (job, ticks) = counting(Duration::from_secs(1));
        let trigger = RefreshTrigger::new();
        let handle = spawn_poll_loop(job, Duration::from_secs(3), trigger.clone());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(trigger.is_in_flight());
        handle.pause();
        trigger.force();
        trigger.force();

        // first tick ends at 1s, the forced one at 2s; nothing else while paused
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let (job, ticks) = counting(Duration::ZERO);
        let handle = spawn_poll_loop(job, Duration::ZERO, RefreshTrigger::new());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!handle.is_finished());
        assert_eq!(ticks.load(Ordering::SeqCst), 3); // t = 0, 100ms, 200ms

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tick_skips_missed_intervals() {
        // 7s of work per tick with a 3s interval
        let (job, ticks) = counting(Duration::from_secs(7));
        let handle = spawn_poll_loop(job, Duration::from_secs(3), RefreshTrigger::new());

        tokio::time::sleep(Duration::from_millis(7_010)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        // 9s and 12s deadlines were missed during the second tick; only one follows
        tokio::time::sleep(Duration::from_millis(7_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        handle.stop().await;
    }

    struct PanickingJob;

    #[async_trait]
    impl PollJob for PanickingJob {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn run_tick(&mut self, _shutdown: &CancellationToken) {
            panic!("boom");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_contained() {
        let handle = spawn_poll_loop(PanickingJob, Duration::from_secs(3), RefreshTrigger::new());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_finished());
        handle.stop().await;
    }
}
