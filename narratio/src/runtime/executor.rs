use crate::runtime::queue::{ReadyQueue, Wake};
use crate::runtime::task::state::State;
use crate::runtime::task::waker::make_waker;
use crate::runtime::task::{AbortHandle, LocalFuture, Task};
use crate::runtime::timer::TimerQueue;
use crate::utils::{Key, Slab};

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::{Context, Waker};
use std::time::Instant;
use tracing::debug;

/// Single-threaded task executor.
///
/// The `Executor` owns every spawned future together with the timer heap,
/// and polls ready tasks one at a time on the runtime thread. Interleaving
/// only happens when a future returns `Poll::Pending`, which gives tasks the
/// cooperative, run-to-suspension semantics the saga scheduler relies on.
///
/// It is responsible for:
/// - storing task futures in a slab,
/// - polling tasks in FIFO wake order, at most `event_budget` per tick,
/// - firing expired timers,
/// - parking the thread until the next wake-up or timer deadline.
pub(crate) struct Executor {
    /// Spawned task futures.
    tasks: RefCell<Slab<Task>>,

    /// Ready queue shared with all wakers.
    pub(crate) queue: Arc<ReadyQueue>,

    /// Pending timers.
    timers: RefCell<TimerQueue>,

    /// Maximum number of tasks polled before timers are checked again.
    event_budget: usize,
}

impl Executor {
    /// Creates an executor polling at most `event_budget` tasks per tick.
    pub(crate) fn new(event_budget: usize) -> Self {
        Self {
            tasks: RefCell::new(Slab::with_capacity(64)),
            queue: Arc::new(ReadyQueue::new()),
            timers: RefCell::new(TimerQueue::default()),
            event_budget,
        }
    }

    /// Stores a future and queues it for its first poll.
    pub(crate) fn spawn(self: &Rc<Self>, future: LocalFuture) -> AbortHandle {
        let key = self.tasks.borrow_mut().insert(Task::new(future));
        self.queue.push(Wake::Task(key));

        AbortHandle::new(Rc::downgrade(self), key)
    }

    /// Stores a future and polls it once right away, on the caller's stack.
    ///
    /// The future runs up to its first suspension before this returns; later
    /// polls go through the ready queue like any other task. Safe to call
    /// while another task is being polled, since a polled future is always
    /// out of its slot.
    pub(crate) fn spawn_now(self: &Rc<Self>, future: LocalFuture) -> AbortHandle {
        let key = self.tasks.borrow_mut().insert(Task::new(future));
        self.poll_task(key);

        AbortHandle::new(Rc::downgrade(self), key)
    }

    /// Returns `true` if the task's future is still owned by the executor.
    pub(crate) fn contains(&self, key: Key) -> bool {
        self.tasks.borrow().contains(key)
    }

    /// Aborts a task by dropping its future.
    ///
    /// A task aborted while it is being polled (a task aborting itself) is
    /// only flagged here; [`poll_task`](Self::poll_task) drops it when the
    /// poll returns.
    pub(crate) fn abort(&self, key: Key) {
        let removed = {
            let mut tasks = self.tasks.borrow_mut();

            match tasks.get_mut(key) {
                Some(task) if task.state == State::Running => {
                    task.state = State::Aborted;
                    None
                }
                Some(_) => tasks.remove(key),
                None => None,
            }
        };

        // Dropped outside the borrow: the future's destructors may reach
        // back into the executor.
        drop(removed);
    }

    /// Registers a timer firing `waker` at `deadline`.
    pub(crate) fn add_timer(&self, deadline: Instant, waker: Waker, cancelled: Arc<AtomicBool>) {
        self.timers.borrow_mut().insert(deadline, waker, cancelled);
    }

    /// Wakes every task whose timer has expired. Returns how many fired.
    pub(crate) fn fire_timers(&self) -> usize {
        let wakers = self.timers.borrow_mut().expired(Instant::now());
        let fired = wakers.len();

        for waker in wakers {
            waker.wake();
        }

        fired
    }

    /// Polls up to `event_budget` ready tasks. Returns how many were polled.
    pub(crate) fn run_ready(&self) -> usize {
        let mut polled = 0;

        while polled < self.event_budget {
            let Some(key) = self.queue.pop() else {
                break;
            };

            self.poll_task(key);
            polled += 1;
        }

        polled
    }

    /// Polls a single task.
    ///
    /// The future is moved out of its slot for the duration of the poll and
    /// put back if it is still pending and was not aborted meanwhile.
    fn poll_task(&self, key: Key) {
        let future = {
            let mut tasks = self.tasks.borrow_mut();

            let Some(task) = tasks.get_mut(key) else {
                return;
            };

            if task.state != State::Idle {
                return;
            }

            task.state = State::Running;
            task.future.take()
        };

        let Some(mut future) = future else {
            return;
        };

        let waker = make_waker(Wake::Task(key), self.queue.clone());
        let mut cx = Context::from_waker(&waker);

        let poll = future.as_mut().poll(&mut cx);

        let finished = {
            let mut tasks = self.tasks.borrow_mut();

            match tasks.get_mut(key) {
                Some(task) if poll.is_pending() && task.state == State::Running => {
                    task.state = State::Idle;
                    task.future = Some(future);
                    None
                }
                Some(_) => Some((future, tasks.remove(key))),
                None => Some((future, None)),
            }
        };

        drop(finished);
    }

    /// Parks the runtime thread until a wake-up or the next timer deadline.
    pub(crate) fn park(&self) {
        let deadline = self.timers.borrow_mut().next_deadline();
        self.queue.park(deadline);
    }

    /// Drops every remaining task future and pending timer.
    pub(crate) fn shutdown(&self) {
        let tasks = self.tasks.borrow_mut().drain();
        let timers = std::mem::take(&mut *self.timers.borrow_mut());

        debug!(tasks = tasks.len(), timers = timers.len(), "executor shut down");

        drop(tasks);
    }

    /// Number of live task futures.
    pub(crate) fn len(&self) -> usize {
        self.tasks.borrow().len()
    }
}
