// ── Deferred work ──
//
// Timers owned by one engine instance. Every handle is tracked until it
// fires or is cancelled, and `cancel_all` releases whatever is left, so
// nothing outlives the engine that scheduled it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

type Registry = Arc<Mutex<HashMap<u64, CancellationToken>>>;

/// Spawns delayed and periodic callbacks on the current runtime.
#[derive(Debug)]
pub struct Scheduler {
    root: CancellationToken,
    timers: Registry,
    next_id: AtomicU64,
}

/// A pending timer. Dropping the handle does not cancel it.
#[derive(Debug)]
pub struct TimerHandle {
    id: u64,
    token: CancellationToken,
    timers: Registry,
}

impl TimerHandle {
    /// Stop the timer if it has not fired yet.
    pub fn cancel(&self) {
        self.token.cancel();
        release(&self.timers, self.id);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Scheduler {
    /// A scheduler whose timers also stop when `parent` is cancelled.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            root: parent.child_token(),
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `task` once after `delay`.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.register();
        let token = handle.token.clone();
        let timers = Arc::clone(&self.timers);
        let id = handle.id;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    release(&timers, id);
                    trace!(id, "timer fired");
                    task.await;
                }
            }
        });
        handle
    }

    /// Run a fresh task from `factory` every `period`, first after one
    /// full period, until cancelled.
    pub fn schedule_repeating<F, Fut>(&self, period: Duration, mut factory: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = self.register();
        let token = handle.token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => factory().await,
                }
            }
        });
        handle
    }

    /// Cancel every outstanding timer.
    pub fn cancel_all(&self) {
        let drained: Vec<CancellationToken> = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, token)| token)
            .collect();
        for token in drained {
            token.cancel();
        }
    }

    /// Timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn register(&self) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, token.clone());
        TimerHandle {
            id,
            token,
            timers: Arc::clone(&self.timers),
        }
    }
}

fn release(timers: &Registry, id: u64) {
    timers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    #[tokio::test(start_paused = true)]
    async fn once_fires_after_delay_and_releases_itself() {
        let scheduler = Scheduler::new(&CancellationToken::new());
        let (tx, rx) = oneshot::channel();
        let started = tokio::time::Instant::now();

        scheduler.schedule_once(Duration::from_millis(5000), async move {
            let _ = tx.send(());
        });
        assert_eq!(scheduler.pending(), 1);

        rx.await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(5000));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let scheduler = Scheduler::new(&CancellationToken::new());
        let (tx, rx) = oneshot::channel::<()>();

        let handle = scheduler.schedule_once(Duration::from_secs(1), async move {
            let _ = tx.send(());
        });
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_runs_until_cancel_all() {
        let scheduler = Scheduler::new(&CancellationToken::new());
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        scheduler.schedule_repeating(Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        scheduler.cancel_all();
        assert_eq!(scheduler.pending(), 0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_stops_timers() {
        let parent = CancellationToken::new();
        let scheduler = Scheduler::new(&parent);
        let (tx, rx) = oneshot::channel::<()>();

        scheduler.schedule_once(Duration::from_secs(1), async move {
            let _ = tx.send(());
        });
        parent.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.await.is_err());
    }
}
