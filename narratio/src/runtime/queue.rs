use crate::utils::Key;

use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

/// What a waker asks the executor to poll again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Wake {
    /// The future passed to `block_on`.
    Root,

    /// A spawned task stored in the executor slab.
    Task(Key),
}

/// Queue of tasks that are ready to be polled.
///
/// The ready queue is the only piece of the executor shared with other
/// threads: wakers push into it from anywhere, while the runtime thread pops
/// from it and parks on its condition variable when nothing is runnable.
///
/// Wake-ups are deduplicated: a task that is already queued is not queued a
/// second time, and tasks are popped in FIFO wake order.
pub(crate) struct ReadyQueue {
    /// Queue state protected by a single lock.
    state: Mutex<QueueState>,

    /// Condition variable used to wake the parked runtime thread.
    condvar: Condvar,
}

struct QueueState {
    /// Tasks in wake order.
    ready: VecDeque<Key>,

    /// Members of `ready`, for deduplication.
    queued: HashSet<Key>,

    /// Whether the root future was woken since it was last polled.
    root: bool,
}

impl ReadyQueue {
    /// Creates an empty queue. The root future starts out notified so that
    /// `block_on` polls it once before anything else.
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                ready: VecDeque::new(),
                queued: HashSet::new(),
                root: true,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Marks `target` as ready and wakes the runtime thread.
    pub(crate) fn push(&self, target: Wake) {
        let mut state = self.state.lock();

        match target {
            Wake::Root => state.root = true,
            Wake::Task(key) => {
                if state.queued.insert(key) {
                    state.ready.push_back(key);
                }
            }
        }

        self.condvar.notify_one();
    }

    /// Pops the next ready task, in wake order.
    pub(crate) fn pop(&self) -> Option<Key> {
        let mut state = self.state.lock();
        let key = state.ready.pop_front()?;
        state.queued.remove(&key);

        Some(key)
    }

    /// Consumes a pending root notification, returning whether there was one.
    pub(crate) fn take_root(&self) -> bool {
        std::mem::take(&mut self.state.lock().root)
    }

    /// Returns `true` if neither a task nor the root future is waiting.
    pub(crate) fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.ready.is_empty() && !state.root
    }

    /// Parks the runtime thread until something is pushed or `deadline`
    /// passes. Returns immediately when work is already available.
    ///
    /// Spurious returns are allowed; the caller re-checks its queues.
    pub(crate) fn park(&self, deadline: Option<Instant>) {
        let mut state = self.state.lock();

        if !state.ready.is_empty() || state.root {
            return;
        }

        match deadline {
            Some(deadline) => {
                self.condvar.wait_until(&mut state, deadline);
            }
            None => self.condvar.wait(&mut state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Slab;

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn push_deduplicates_and_keeps_fifo_order() {
        let mut slab = Slab::with_capacity(3);
        let a = slab.insert(());
        let b = slab.insert(());

        let queue = ReadyQueue::new();
        queue.push(Wake::Task(a));
        queue.push(Wake::Task(b));
        queue.push(Wake::Task(a));

        assert_eq!(queue.pop(), Some(a));
        assert_eq!(queue.pop(), Some(b));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn root_notification_is_consumed_once() {
        let queue = ReadyQueue::new();

        assert!(queue.take_root());
        assert!(!queue.take_root());
        assert!(queue.is_idle());

        queue.push(Wake::Root);
        assert!(!queue.is_idle());
        assert!(queue.take_root());
    }

    #[test]
    fn park_returns_when_another_thread_pushes() {
        let queue = Arc::new(ReadyQueue::new());
        queue.take_root();

        let remote = queue.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.push(Wake::Root);
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while !queue.take_root() {
            assert!(Instant::now() < deadline, "remote push never woke the parked thread");
            queue.park(Some(deadline));
        }

        waker.join().unwrap();
    }
}
