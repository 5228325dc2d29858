use crate::runtime::queue::{ReadyQueue, Wake};

use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Data carried by every runtime waker: what to wake and where to queue it.
struct WakeHandle {
    target: Wake,
    queue: Arc<ReadyQueue>,
}

/// The vtable shared by all runtime wakers.
///
/// It defines how the executor interacts with a task when:
/// - cloning the waker,
/// - waking the task,
/// - waking by reference,
/// - dropping the waker.
static VTABLE: RawWakerVTable =
    RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw);

/// Creates a [`Waker`] that re-queues `target` on `queue`.
///
/// The waker only holds a key and a handle to the ready queue, never the
/// task itself, so it is `Send + Sync` even though task futures are not:
/// work finishing on another thread can wake the runtime thread safely.
///
/// # Safety
///
/// This function relies on a custom `RawWaker` implementation backed by an
/// `Arc<WakeHandle>`. The pointer stored inside the `RawWaker` originates
/// from `Arc::into_raw` and every vtable function below keeps the reference
/// count balanced.
pub(crate) fn make_waker(target: Wake, queue: Arc<ReadyQueue>) -> Waker {
    let handle = Arc::new(WakeHandle { target, queue });

    unsafe { Waker::from_raw(RawWaker::new(Arc::into_raw(handle) as *const (), &VTABLE)) }
}

/// Clones the raw waker by bumping the reference count of the handle.
fn clone_raw(ptr: *const ()) -> RawWaker {
    unsafe { Arc::increment_strong_count(ptr as *const WakeHandle) };

    RawWaker::new(ptr, &VTABLE)
}

/// Wakes the target and consumes the waker.
fn wake_raw(ptr: *const ()) {
    let handle = unsafe { Arc::from_raw(ptr as *const WakeHandle) };
    handle.queue.push(handle.target);
}

/// Wakes the target without consuming the waker.
fn wake_by_ref_raw(ptr: *const ()) {
    let handle = unsafe { &*(ptr as *const WakeHandle) };
    handle.queue.push(handle.target);
}

/// Drops the raw waker, releasing its reference to the handle.
fn drop_raw(ptr: *const ()) {
    unsafe { drop(Arc::from_raw(ptr as *const WakeHandle)) };
}
