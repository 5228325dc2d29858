use super::JoinHandle;
use super::handle::{AbortHandle, JoinSlot};
use super::state::State;
use crate::runtime::context;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// A type-erased, boxed future owned by the executor.
///
/// Futures never leave the runtime thread, so they are not required to be
/// `Send`.
pub(crate) type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// A spawned task managed by the executor.
///
/// A `Task` is the container for a future. While the task is being polled
/// its future is moved out of the slot, which lets the future itself spawn or
/// abort other tasks without re-entering a borrow of the executor slab.
pub(crate) struct Task {
    /// The underlying future, `None` while it is being polled.
    pub(crate) future: Option<LocalFuture>,

    /// The current scheduling state of the slot.
    pub(crate) state: State,
}

impl Task {
    /// Creates a new idle task from a boxed future.
    pub(crate) fn new(future: LocalFuture) -> Self {
        Self {
            future: Some(future),
            state: State::Idle,
        }
    }
}

/// Spawns a future as a task onto the current runtime.
///
/// The task is queued immediately and first polled on the next executor
/// tick. The returned [`JoinHandle`] resolves to the future's output.
///
/// # Panics
///
/// Panics if called outside the context of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let handle = narratio::task::spawn(async { 40 + 2 });
/// assert_eq!(handle.await, 42);
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let executor =
        context::current().expect("spawn must be called within the context of a runtime");

    let slot = Rc::new(RefCell::new(JoinSlot::new()));
    let producer = slot.clone();

    let abort = executor.spawn(Box::pin(async move {
        let output = future.await;
        JoinSlot::complete(&producer, output);
    }));

    JoinHandle::new(slot, abort)
}

/// Spawns an already boxed future and polls it up to its first suspension
/// before returning its abort handle.
///
/// Used by the saga scheduler, which tracks completion itself. Returns
/// `None` outside a runtime.
pub(crate) fn spawn_started(future: LocalFuture) -> Option<AbortHandle> {
    context::current().map(|executor| executor.spawn_now(future))
}
