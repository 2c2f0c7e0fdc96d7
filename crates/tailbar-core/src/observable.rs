// ── Observable values ──
//
// A typed holder that remembers its last value and tells interested
// parties when, and only when, a new value differs from it. Listeners
// can register a callback or take a `watch` receiver / `Stream`.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Observable::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Last-value holder with equality-gated change notification.
pub struct Observable<T> {
    value: watch::Sender<T>,
    listeners: Mutex<Vec<(ListenerId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Store `value` if it differs from the current one.
    ///
    /// Returns `true` when the value changed; listeners and receivers are
    /// notified only in that case.
    pub fn set(&self, value: T) -> bool {
        let changed = self.value.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });

        if changed {
            let current = self.get();
            let callbacks: Vec<Callback<T>> = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(_, cb)| Arc::clone(cb))
                .collect();
            for callback in callbacks {
                callback(&current);
            }
        }
        changed
    }

    /// Register `callback` to run after every change.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// A receiver positioned at the current value.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    /// Stream that yields the current value, then every change.
    pub fn stream(&self) -> ObservableStream<T> {
        ObservableStream {
            inner: WatchStream::new(self.value.subscribe()),
        }
    }

    /// Drop every registered callback.
    pub(crate) fn clear_listeners(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.borrow())
            .finish_non_exhaustive()
    }
}

/// `Stream` adapter backed by an observable's `watch` channel.
pub struct ObservableStream<T> {
    inner: WatchStream<T>,
}

impl<T: Clone + Send + Sync + 'static> Stream for ObservableStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn same_value_twice_notifies_once() {
        let obs = Observable::new(false);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        obs.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(obs.set(true));
        assert!(!obs.set(true));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(obs.get());
    }

    #[test]
    fn equality_is_structural() {
        let obs = Observable::new(Some(Arc::new(vec![1, 2, 3])));
        assert!(!obs.set(Some(Arc::new(vec![1, 2, 3]))));
        assert!(obs.set(Some(Arc::new(vec![1, 2]))));
        assert!(obs.set(None));
    }

    #[test]
    fn unsubscribe_stops_callbacks() {
        let obs = Observable::new(0_u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = obs.subscribe(move |v| sink.lock().unwrap().push(*v));

        obs.set(1);
        assert!(obs.unsubscribe(id));
        assert!(!obs.unsubscribe(id));
        obs.set(2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(obs.listener_count(), 0);
    }

    #[tokio::test]
    async fn watch_receivers_see_only_changes() {
        let obs = Observable::new("idle".to_owned());
        let mut rx = obs.watch();

        obs.set("idle".to_owned());
        assert!(!rx.has_changed().unwrap());

        obs.set("busy".to_owned());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "busy");
    }
}
