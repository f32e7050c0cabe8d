//! Refresh scheduler
//!
//! Runs a job on a fixed interval on a background task and delivers each
//! result to a consumer channel. The scheduler owns its cancellation token
//! and a small state machine:
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped
//! ```
//!
//! `stop()` only cancels future ticks. An invocation already in flight runs
//! to completion and its result is still delivered.
//!
//! Background work is spawned on the tokio runtime that was current when
//! the scheduler was created, so `start()` and `refresh_now()` may be called
//! from plain threads afterwards. Without any runtime they log a warning
//! and do nothing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default refresh period
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Job<T> = Arc<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Periodic job runner
pub struct RefreshScheduler<T> {
    job: Job<T>,
    period: Duration,
    results: mpsc::UnboundedSender<T>,
    running: Mutex<Option<CancellationToken>>,
    state: watch::Sender<SchedulerState>,
    runtime: Option<Handle>,
}

impl<T: Send + 'static> RefreshScheduler<T> {
    /// Create a stopped scheduler delivering `job` results into `results`
    pub fn new<F, Fut>(period: Duration, results: mpsc::UnboundedSender<T>, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self {
            job: Arc::new(move || Box::pin(job()) as BoxFuture<T>),
            period,
            results,
            running: Mutex::new(None),
            state,
            runtime: Handle::try_current().ok(),
        }
    }

    /// Runtime to spawn on: the one captured at creation, else the caller's
    fn runtime(&self) -> Option<Handle> {
        self.runtime.clone().or_else(|| Handle::try_current().ok())
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Begin ticking; the first tick fires one period from now
    ///
    /// Returns `false` if the scheduler was already running or no tokio
    /// runtime is available.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            debug!("Refresh scheduler already running");
            return false;
        }
        let Some(runtime) = self.runtime() else {
            warn!("No tokio runtime, refresh scheduler not started");
            return false;
        };

        let cancel = CancellationToken::new();
        runtime.spawn(run_ticks(
            Arc::clone(&self.job),
            self.period,
            self.results.clone(),
            cancel.clone(),
        ));
        *running = Some(cancel);
        self.state.send_replace(SchedulerState::Running);

        info!(period_secs = self.period.as_secs_f64(), "Refresh scheduler started");
        true
    }

    /// Cancel future ticks. Returns `false` if the scheduler was not running.
    pub fn stop(&self) -> bool {
        let Some(cancel) = self.running.lock().take() else {
            debug!("Refresh scheduler already stopped");
            return false;
        };

        cancel.cancel();
        self.state.send_replace(SchedulerState::Stopped);
        info!("Refresh scheduler stopped");
        true
    }

    /// Run one out-of-band invocation now, leaving the tick schedule alone
    ///
    /// Returns `false` if no tokio runtime is available to run it on.
    pub fn refresh_now(&self) -> bool {
        let Some(runtime) = self.runtime() else {
            warn!("No tokio runtime, refresh skipped");
            return false;
        };

        let job = Arc::clone(&self.job);
        let results = self.results.clone();
        runtime.spawn(async move {
            let value = job().await;
            if results.send(value).is_err() {
                debug!("Refresh result dropped, consumer gone");
            }
        });
        true
    }
}

impl<T> Drop for RefreshScheduler<T> {
    fn drop(&mut self) {
        if let Some(cancel) = self.running.get_mut().take() {
            cancel.cancel();
        }
    }
}

async fn run_ticks<T>(
    job: Job<T>,
    period: Duration,
    results: mpsc::UnboundedSender<T>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                // not raced against cancellation: an in-flight run completes
                let value = job().await;
                if results.send(value).is_err() {
                    debug!("Consumer gone, ending refresh loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PERIOD: Duration = Duration::from_secs(10);

    fn create_test_scheduler() -> (RefreshScheduler<Instant>, mpsc::UnboundedReceiver<Instant>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = RefreshScheduler::new(PERIOD, tx, || async { Instant::now() });
        (scheduler, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_period() {
        let (scheduler, mut rx) = create_test_scheduler();
        let started = Instant::now();
        assert!(scheduler.start());

        for k in 1..=3u32 {
            let at = rx.recv().await.unwrap();
            assert_eq!(at, started + PERIOD * k);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_intervals_three_invocations() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let scheduler = RefreshScheduler::new(PERIOD, tx, move || {
            let counter = Arc::clone(&counter);
            async move { counter.fetch_add(1, Ordering::SeqCst) }
        });

        scheduler.start();
        tokio::time::sleep(PERIOD * 3 + Duration::from_millis(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let mut delivered = Vec::new();
        while let Ok(v) = rx.try_recv() {
            delivered.push(v);
        }
        assert_eq!(delivered, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let (scheduler, mut rx) = create_test_scheduler();
        scheduler.start();
        rx.recv().await.unwrap();

        assert!(scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        tokio::time::sleep(PERIOD * 5).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_does_not_shift_ticks() {
        let (scheduler, mut rx) = create_test_scheduler();
        let started = Instant::now();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(5)).await;
        scheduler.refresh_now();

        assert_eq!(rx.recv().await.unwrap(), started + Duration::from_secs(5));
        assert_eq!(rx.recv().await.unwrap(), started + PERIOD);
        assert_eq!(rx.recv().await.unwrap(), started + PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_idempotent() {
        let (scheduler, _rx) = create_test_scheduler();
        let mut states = scheduler.subscribe();

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert_eq!(*states.borrow_and_update(), SchedulerState::Running);

        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(*states.borrow_and_update(), SchedulerState::Stopped);

        // restart after stop
        assert!(scheduler.start());
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_run_completes_after_stop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = RefreshScheduler::new(PERIOD, tx, || async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "done"
        });
        scheduler.start();

        // inside the first invocation
        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        scheduler.stop();

        assert_eq!(rx.recv().await, Some("done"));
        tokio::time::sleep(PERIOD * 3).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_calls_from_plain_thread_use_creating_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (scheduler, mut rx) = {
            let _entered = runtime.enter();
            create_test_scheduler()
        };

        // no runtime is current on this thread any more
        assert!(Handle::try_current().is_err());
        assert!(scheduler.refresh_now());
        assert!(runtime.block_on(rx.recv()).is_some());

        assert!(scheduler.start());
        assert!(scheduler.stop());
    }

    #[test]
    fn test_without_runtime_nothing_is_spawned() {
        let (scheduler, mut rx) = create_test_scheduler();

        assert!(!scheduler.refresh_now());
        assert!(!scheduler.start());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(rx.try_recv().is_err());
    }
}
