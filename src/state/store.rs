use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::AppState;

/// Published once per `apply` that produced a different state
#[derive(Debug, Clone)]
pub struct StateChangeEvent {
    pub previous: AppState,
    pub next: AppState,
    pub is_session_restore: bool,
}

/// Handle returned by [`StateStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&StateChangeEvent) + Send + Sync>;

struct Inner {
    state: Mutex<AppState>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
}

/// Holds the current snapshot and fans out change notifications.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The latest fully formed snapshot
    pub fn state(&self) -> AppState {
        self.inner.state.lock().clone()
    }

    /// Run `reducer` on the current state and publish if the result differs.
    /// Returns whether the state changed.
    pub fn apply<F>(&self, reducer: F) -> bool
    where
        F: FnOnce(&AppState) -> AppState,
    {
        self.apply_with(false, reducer)
    }

    /// Same as [`apply`](Self::apply), tagging the event as a session restore
    pub fn apply_with<F>(&self, is_session_restore: bool, reducer: F) -> bool
    where
        F: FnOnce(&AppState) -> AppState,
    {
        let (previous, next) = {
            let mut current = self.inner.state.lock();
            let next = reducer(&current);
            if next == *current {
                return false;
            }
            let previous = std::mem::replace(&mut *current, next.clone());
            (previous, next)
        };

        // Subscribers run outside the state lock so they may call `apply`
        let event = StateChangeEvent {
            previous,
            next,
            is_session_restore,
        };
        self.publish(&event);
        true
    }

    /// Replace the whole state
    pub fn set_state(&self, state: AppState, is_session_restore: bool) -> bool {
        self.apply_with(is_session_restore, move |_| state)
    }

    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&StateChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().push((id, Arc::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    fn publish(&self, event: &StateChangeEvent) {
        let subscribers: Vec<Subscriber> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        for subscriber in subscribers {
            subscriber(event);
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
