use crate::runtime::executor::Executor;

use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    /// Thread-local handle to the executor of the runtime currently driving
    /// this thread.
    ///
    /// It is set while [`Runtime::block_on`](crate::Runtime::block_on) runs
    /// and lets runtime components (timers, spawning, the saga scheduler)
    /// reach the executor without explicit parameter passing.
    static CURRENT_EXECUTOR: RefCell<Option<Rc<Executor>>> = const { RefCell::new(None) };
}

/// Enters the runtime execution context for the current thread.
///
/// The executor is installed for the duration of the closure `f`; the
/// previous context is restored afterwards, so nested runtimes on the same
/// thread behave.
pub(crate) fn enter_context<R>(executor: Rc<Executor>, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_EXECUTOR.with(|cell| cell.replace(Some(executor)));

    let out = f();

    CURRENT_EXECUTOR.with(|cell| cell.replace(previous));

    out
}

/// Returns the executor of the runtime driving this thread, if any.
pub(crate) fn current() -> Option<Rc<Executor>> {
    CURRENT_EXECUTOR.with(|cell| cell.borrow().clone())
}
