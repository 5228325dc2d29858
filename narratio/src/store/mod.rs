//! The state container sagas read from and dispatch into.
//!
//! A [`Store`] holds the current state as an immutable snapshot and replaces
//! it on every dispatch with the output of a pure reducer. After each state
//! change it notifies its subscribers, then offers the action to the sagas
//! waiting on it through the action bus.
//!
//! ```rust,ignore
//! let store = Store::new(0u32, |count: &u32, action: &Counter| match action {
//!     Counter::Increment => count + 1,
//!     Counter::Reset => 0,
//! });
//!
//! store.dispatch(Counter::Increment);
//! assert_eq!(*store.state(), 1);
//! ```

mod bus;

pub use bus::{ActionChannel, ChannelTake, Take};

use crate::action::{Action, IntoPattern};
use bus::ActionBus;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

type Reducer<S, A> = Box<dyn Fn(&S, &A) -> S + Send + Sync>;
type Listener<S, A> = Arc<dyn Fn(&S, &A) + Send + Sync>;

/// Dispatches waiting to be applied.
struct Pending<A> {
    queue: VecDeque<A>,

    /// Whether some caller is currently applying the queue.
    draining: bool,
}

struct StoreInner<S, A: Action> {
    state: Mutex<Arc<S>>,
    reducer: Reducer<S, A>,
    listeners: Mutex<Vec<(u64, Listener<S, A>)>>,
    next_listener: AtomicU64,
    pending: Mutex<Pending<A>>,
    dispatched: AtomicU64,
    bus: Arc<ActionBus<A>>,
}

/// A handle to a shared state container.
///
/// Cloning a `Store` is cheap and every clone refers to the same state.
///
/// Dispatch is serialized: an action dispatched while another dispatch is
/// being applied (from a listener, a woken saga or another thread) is queued
/// and applied right after it, so every observer sees the same total order.
/// A queued dispatch returns before its action has been applied.
pub struct Store<S, A: Action> {
    inner: Arc<StoreInner<S, A>>,
}

impl<S, A: Action> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: 'static, A: Action> Store<S, A> {
    /// Creates a store holding `initial`, updated by `reducer`.
    pub fn new(initial: S, reducer: impl Fn(&S, &A) -> S + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(initial)),
                reducer: Box::new(reducer),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                pending: Mutex::new(Pending {
                    queue: VecDeque::new(),
                    draining: false,
                }),
                dispatched: AtomicU64::new(0),
                bus: Arc::new(ActionBus::new()),
            }),
        }
    }

    /// Dispatches an action.
    ///
    /// The reducer computes the next state, subscribers are notified in
    /// subscription order, then matching `take`s and channels receive the
    /// action in registration order.
    pub fn dispatch(&self, action: A) {
        {
            let mut pending = self.inner.pending.lock();
            pending.queue.push_back(action);

            if pending.draining {
                return;
            }
            pending.draining = true;
        }

        loop {
            let next = {
                let mut pending = self.inner.pending.lock();
                let next = pending.queue.pop_front();

                if next.is_none() {
                    pending.draining = false;
                }

                next
            };

            match next {
                Some(action) => self.apply(action),
                None => break,
            }
        }
    }

    fn apply(&self, action: A) {
        let current = self.state();
        let next = Arc::new((self.inner.reducer)(&current, &action));
        drop(current);

        *self.inner.state.lock() = next.clone();
        let seq = self.inner.dispatched.fetch_add(1, Ordering::AcqRel) + 1;

        trace!(kind = ?action.kind(), seq, "action dispatched");

        let listeners: Vec<_> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(&next, &action);
        }

        self.inner.bus.publish(&action);
    }

    /// Returns the current state snapshot.
    pub fn state(&self) -> Arc<S> {
        self.inner.state.lock().clone()
    }

    /// Number of actions applied so far.
    pub fn dispatched(&self) -> u64 {
        self.inner.dispatched.load(Ordering::Acquire)
    }

    /// Registers a listener called with the new state and the action after
    /// every dispatch.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`unsubscribed`](Subscription::unsubscribe).
    pub fn subscribe(&self, listener: impl Fn(&S, &A) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));

        debug!(listener = id, "store listener added");

        let store: Weak<StoreInner<S, A>> = Arc::downgrade(&self.inner);

        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(store) = store.upgrade() {
                    store.listeners.lock().retain(|(other, _)| *other != id);
                    debug!(listener = id, "store listener removed");
                }
            })),
        }
    }

    /// Opens a buffered channel receiving every action matching `pattern`
    /// from now on.
    pub fn channel(&self, pattern: impl IntoPattern<A>) -> ActionChannel<A> {
        self.inner.bus.channel(pattern.into_pattern())
    }

    /// Returns a future resolving with the next dispatched action matching
    /// `pattern`.
    pub fn take(&self, pattern: impl IntoPattern<A>) -> Take<A> {
        self.inner.bus.take(pattern.into_pattern())
    }
}

impl<S: fmt::Debug, A: Action> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.lock())
            .field("dispatched", &self.inner.dispatched.load(Ordering::Acquire))
            .field("waiters", &self.inner.bus.len())
            .finish()
    }
}

/// Keeps a store listener registered.
///
/// Dropping the subscription removes the listener.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Removes the listener now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}
