/// Scheduling state of a task slot in the executor.
///
/// Only the runtime thread reads or writes it, so a plain enum is enough.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// The future sits in its slot, waiting to be woken.
    Idle,

    /// The future has been taken out of its slot and is being polled.
    Running,

    /// The task was aborted while it was being polled.
    ///
    /// Its future is dropped as soon as the current poll returns.
    Aborted,
}
