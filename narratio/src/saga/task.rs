use crate::error::{SagaError, SagaResult};
use crate::saga::effect::{BoxFuture, EffectKind};

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Unique identifier of a saga task, allocated in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a saga task.
///
/// ```text
/// Pending -> Running <-> Suspended
///               |
///               +-> Completed | Failed | Cancelled
/// ```
///
/// The three terminal states are sinks: once reached the state never
/// changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created, not polled yet.
    Pending,

    /// Being polled by the runtime.
    Running,

    /// Waiting on an outstanding effect.
    Suspended,

    /// The body returned `Ok(())`.
    Completed,

    /// The body returned an error.
    Failed,

    /// The task was cancelled, directly or through an ancestor.
    Cancelled,
}

impl TaskState {
    /// Returns `true` for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// How a task settled.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Completed,
    Failed(SagaError),
    Cancelled,
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled)
    }

    fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Completed => TaskState::Completed,
            TaskOutcome::Failed(_) => TaskState::Failed,
            TaskOutcome::Cancelled => TaskState::Cancelled,
        }
    }
}

struct TaskShared {
    id: TaskId,
    name: Cow<'static, str>,
    state: Cell<TaskState>,
    pending: Cell<Option<EffectKind>>,
    outcome: RefCell<Option<TaskOutcome>>,
    joiners: RefCell<Vec<Waker>>,
}

/// A cheap, clonable reference to a saga task.
///
/// The handle stays valid after the task settles and after the scheduler has
/// forgotten it, so its outcome can always be read.
#[derive(Clone)]
pub struct TaskHandle {
    shared: Rc<TaskShared>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, name: Cow<'static, str>) -> Self {
        Self {
            shared: Rc::new(TaskShared {
                id,
                name,
                state: Cell::new(TaskState::Pending),
                pending: Cell::new(None),
                outcome: RefCell::new(None),
                joiners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub(crate) fn name_cow(&self) -> Cow<'static, str> {
        self.shared.name.clone()
    }

    pub fn state(&self) -> TaskState {
        self.shared.state.get()
    }

    /// The effect the task is currently waiting on, if any.
    pub fn pending_effect(&self) -> Option<EffectKind> {
        self.shared.pending.get()
    }

    /// The outcome, once the task has settled.
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.shared.outcome.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// The outcome as a result, once the task has settled.
    ///
    /// A failure is wrapped in [`SagaError::Task`] naming this task. A
    /// cancelled task yields `Ok(())`: cancellation is not an error.
    pub fn result(&self) -> Option<SagaResult> {
        self.outcome().map(|outcome| match outcome {
            TaskOutcome::Failed(source) => Err(SagaError::Task {
                id: self.id(),
                name: self.name_cow(),
                source: Box::new(source),
            }),
            TaskOutcome::Completed | TaskOutcome::Cancelled => Ok(()),
        })
    }

    /// Moves a live task between `Running` and `Suspended`.
    pub(crate) fn set_state(&self, state: TaskState) {
        if !self.is_settled() {
            self.shared.state.set(state);
        }
    }

    pub(crate) fn set_pending(&self, effect: Option<EffectKind>) {
        self.shared.pending.set(effect);
    }

    /// Records the outcome and wakes every joiner.
    ///
    /// Returns `false` if the task had already settled.
    pub(crate) fn settle(&self, outcome: TaskOutcome) -> bool {
        if self.is_settled() {
            return false;
        }

        self.shared.state.set(outcome.state());
        self.shared.pending.set(None);
        *self.shared.outcome.borrow_mut() = Some(outcome);

        let joiners = std::mem::take(&mut *self.shared.joiners.borrow_mut());
        for waker in joiners {
            waker.wake();
        }

        true
    }

    pub(crate) fn poll_join(&self, cx: &mut Context<'_>) -> Poll<TaskOutcome> {
        if let Some(outcome) = self.outcome() {
            return Poll::Ready(outcome);
        }

        let mut joiners = self.shared.joiners.borrow_mut();
        if !joiners.iter().any(|waker| waker.will_wake(cx.waker())) {
            joiners.push(cx.waker().clone());
        }

        Poll::Pending
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for TaskHandle {}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Drives a saga body while keeping its handle's state in step with the
/// runtime: `Running` while polled, `Suspended` when it yields.
pub(crate) struct Lifecycle {
    task: TaskHandle,
    body: BoxFuture<'static, SagaResult>,
}

impl Lifecycle {
    pub(crate) fn new(task: TaskHandle, body: BoxFuture<'static, SagaResult>) -> Self {
        Self { task, body }
    }
}

impl Future for Lifecycle {
    type Output = SagaResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<SagaResult> {
        self.task.set_state(TaskState::Running);

        let poll = self.body.as_mut().poll(cx);

        if poll.is_pending() {
            self.task.set_state(TaskState::Suspended);
        }

        poll
    }
}
