//! Periodic refresh loop with a runtime interval and a pause/resume switch.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, info};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};

/// Something the scheduler can refresh on every tick.
#[async_trait]
pub trait Refreshable: Send + Sync + 'static {
    async fn refresh(&self);

    /// Read before scheduling each tick, so changes apply to the next one.
    fn refresh_interval(&self) -> Duration;
}

#[derive(Debug)]
enum Control {
    Pause,
    Resume,
    Shutdown,
}

/// Handle to a running refresh loop. Dropping it stops the loop.
///
/// Ticks are serialized: the loop awaits each refresh before scheduling the
/// next, so a slow fetch delays the following tick instead of overlapping it.
pub struct RefreshScheduler {
    commands: mpsc::UnboundedSender<Control>,
    active: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Starts the loop; the first tick fires right away, later ticks one
    /// interval after the previous refresh finished.
    pub fn spawn<T: Refreshable>(target: Arc<T>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (active, _) = watch::channel(true);
        let handle = tokio::spawn(run(target, receiver));
        Self {
            commands,
            active,
            handle,
        }
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Receiver for the "auto-update active" flag.
    pub fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    /// Stops scheduling; state already gathered is kept.
    pub fn pause(&self) {
        self.active.send_replace(false);
        let _ = self.commands.send(Control::Pause);
    }

    /// Refreshes immediately, then continues at the configured interval.
    pub fn resume(&self) {
        self.active.send_replace(true);
        let _ = self.commands.send(Control::Resume);
    }

    pub fn toggle(&self) -> bool {
        if self.is_active() {
            self.pause();
            false
        } else {
            self.resume();
            true
        }
    }

    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Control::Shutdown);
        let _ = (&mut self.handle).await;
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<T: Refreshable>(target: Arc<T>, mut commands: mpsc::UnboundedReceiver<Control>) {
    let mut active = true;
    let mut next_tick = Instant::now();
    info!(
        "[scheduler] Started (interval: {}ms)",
        target.refresh_interval().as_millis()
    );

    loop {
        if active {
            // Commands first, so a pause queued before a due tick wins.
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Control::Pause) => {
                        debug!("[scheduler] Paused");
                        active = false;
                    }
                    Some(Control::Resume) => {}
                    Some(Control::Shutdown) | None => break,
                },
                _ = sleep_until(next_tick) => {
                    target.refresh().await;
                    next_tick = Instant::now() + target.refresh_interval();
                }
            }
        } else {
            match commands.recv().await {
                Some(Control::Resume) => {
                    debug!("[scheduler] Resumed");
                    active = true;
                    target.refresh().await;
                    next_tick = Instant::now() + target.refresh_interval();
                }
                Some(Control::Pause) => {}
                Some(Control::Shutdown) | None => break,
            }
        }
    }

    info!("[scheduler] Stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use tokio::time::sleep;

    use super::*;

    struct Counter {
        ticks: AtomicUsize,
        interval_ms: AtomicU64,
    }

    impl Counter {
        fn new(interval_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                ticks: AtomicUsize::new(0),
                interval_ms: AtomicU64::new(interval_ms),
            })
        }

        fn ticks(&self) -> usize {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Refreshable for Counter {
        async fn refresh(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn refresh_interval(&self) -> Duration {
            Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_at_the_interval() {
        let counter = Counter::new(100);
        let scheduler = RefreshScheduler::spawn(counter.clone());

        sleep(Duration::from_millis(1)).await;
        assert_eq!(counter.ticks(), 1);

        sleep(Duration::from_millis(349)).await;
        assert_eq!(counter.ticks(), 4);
        assert!(scheduler.is_active());

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticks_and_resume_refreshes_immediately() {
        let counter = Counter::new(100);
        let scheduler = RefreshScheduler::spawn(counter.clone());
        let active = scheduler.subscribe_active();

        sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.ticks(), 2);

        scheduler.pause();
        assert!(!*active.borrow());
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(counter.ticks(), 2);

        scheduler.resume();
        sleep(Duration::from_millis(1)).await;
        assert_eq!(counter.ticks(), 3);
        assert!(*active.borrow());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.ticks(), 4);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_applies_to_next_tick() {
        let counter = Counter::new(100);
        let scheduler = RefreshScheduler::spawn(counter.clone());

        sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.ticks(), 1);
        counter.interval_ms.store(1_000, Ordering::SeqCst);

        // The pending tick still fires on the old schedule.
        sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.ticks(), 2);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.ticks(), 2);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.ticks(), 3);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_flips_the_active_flag() {
        let counter = Counter::new(100);
        let scheduler = RefreshScheduler::spawn(counter.clone());

        assert!(!scheduler.toggle());
        assert!(!scheduler.is_active());
        assert!(scheduler.toggle());
        sleep(Duration::from_millis(1)).await;
        assert_eq!(counter.ticks(), 1);

        scheduler.shutdown().await;
    }
}
