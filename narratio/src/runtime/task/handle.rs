use crate::runtime::executor::Executor;
use crate::utils::Key;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// Shared completion slot between a spawned task and its [`JoinHandle`].
pub(crate) struct JoinSlot<T> {
    /// Output of the task, until the handle takes it.
    output: Option<T>,

    /// Whether the task ran to completion.
    finished: bool,

    /// Waker of the task awaiting the handle.
    waker: Option<Waker>,
}

impl<T> JoinSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            output: None,
            finished: false,
            waker: None,
        }
    }

    /// Stores the task output and wakes the awaiting handle, if any.
    pub(crate) fn complete(slot: &Rc<RefCell<Self>>, output: T) {
        let waker = {
            let mut slot = slot.borrow_mut();
            slot.output = Some(output);
            slot.finished = true;
            slot.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Handle used to abort a spawned task.
///
/// It holds a weak reference to the executor so that a handle kept alive
/// after the runtime is gone neither leaks it nor panics.
#[derive(Clone)]
pub(crate) struct AbortHandle {
    executor: Weak<Executor>,
    key: Key,
}

impl AbortHandle {
    pub(crate) fn new(executor: Weak<Executor>, key: Key) -> Self {
        Self { executor, key }
    }

    /// Aborts the task, dropping its future.
    ///
    /// If the task is the one currently being polled, its future is dropped
    /// once that poll returns.
    pub(crate) fn abort(&self) {
        if let Some(executor) = self.executor.upgrade() {
            executor.abort(self.key);
        }
    }

    /// Returns `true` while the task's future is still owned by the executor.
    pub(crate) fn is_alive(&self) -> bool {
        self.executor
            .upgrade()
            .is_some_and(|executor| executor.contains(self.key))
    }
}

/// A handle to a spawned task.
///
/// A `JoinHandle` allows awaiting the result of a task spawned onto the
/// runtime. It implements [`Future`] and resolves once the task has
/// completed.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only discards
/// the ability to observe its result. An aborted task never resolves its
/// handle; check [`is_finished`](Self::is_finished) before awaiting one that
/// may have been aborted.
pub struct JoinHandle<T> {
    slot: Rc<RefCell<JoinSlot<T>>>,
    abort: AbortHandle,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(slot: Rc<RefCell<JoinSlot<T>>>, abort: AbortHandle) -> Self {
        Self { slot, abort }
    }

    /// Aborts the task. Its future is dropped without running further.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Returns `true` once the task has completed or been aborted.
    pub fn is_finished(&self) -> bool {
        self.slot.borrow().finished || !self.abort.is_alive()
    }
}

impl<T> Future for JoinHandle<T> {
    /// The output of the spawned task.
    type Output = T;

    /// Polls the join handle.
    ///
    /// If the task has already completed, its result is returned
    /// immediately. Otherwise, the current waker is registered and the
    /// future returns `Poll::Pending`.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut slot = self.slot.borrow_mut();

        match slot.output.take() {
            Some(output) => Poll::Ready(output),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
