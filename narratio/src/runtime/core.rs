use super::context::enter_context;
use super::executor::Executor;
use super::queue::Wake;
use super::task::waker::make_waker;
use crate::task::{self, JoinHandle};

use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::debug;

/// The main runtime handle.
///
/// `Runtime` is responsible for:
/// - spawning asynchronous tasks,
/// - driving task execution and timers on the calling thread,
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// The runtime is single-threaded: every spawned future, and therefore every
/// saga, runs on the thread that calls `block_on`. Wakers may be used from
/// any thread.
///
/// Dropping the runtime drops every task that is still alive.
pub struct Runtime {
    /// Task executor responsible for scheduling and running futures.
    executor: Rc<Executor>,
}

impl Runtime {
    /// Creates a new runtime instance.
    ///
    /// # Arguments
    ///
    /// * `event_budget` - Number of tasks polled before timers are checked.
    pub(crate) fn new(event_budget: usize) -> Self {
        debug!(event_budget, "runtime created");

        Self {
            executor: Rc::new(Executor::new(event_budget)),
        }
    }

    /// Spawns a future onto the runtime.
    ///
    /// The future starts running on the next call to
    /// [`block_on`](Self::block_on).
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = runtime.spawn(async { 1 });
    /// assert_eq!(runtime.block_on(handle), 1);
    /// ```
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        enter_context(self.executor.clone(), || task::spawn(future))
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// While the future is pending the runtime keeps polling spawned tasks
    /// and firing timers; when nothing is runnable the thread parks until a
    /// waker fires or the next timer is due.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async {
    ///     42
    /// });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        enter_context(self.executor.clone(), || {
            let mut future = pin!(future);

            let waker = make_waker(Wake::Root, self.executor.queue.clone());
            let mut cx = Context::from_waker(&waker);

            loop {
                if self.executor.queue.take_root() {
                    if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                        return output;
                    }
                }

                self.executor.fire_timers();

                let polled = self.executor.run_ready();

                if polled == 0 && self.executor.queue.is_idle() {
                    self.executor.park();
                }
            }
        })
    }

    /// Number of spawned tasks that have neither completed nor been aborted.
    pub fn live_tasks(&self) -> usize {
        self.executor.len()
    }
}

impl Drop for Runtime {
    /// Shuts down the runtime, dropping every task still alive.
    fn drop(&mut self) {
        enter_context(self.executor.clone(), || self.executor.shutdown());
    }
}
