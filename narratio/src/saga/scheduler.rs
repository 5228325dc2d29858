use crate::action::Action;
use crate::error::{SagaError, SagaResult};
use crate::runtime::context;
use crate::runtime::task::{AbortHandle, spawn_started};
use crate::saga::context::{BoxSaga, Saga, SagaContext};
use crate::saga::task::{Lifecycle, TaskHandle, TaskId, TaskOutcome};
use crate::store::Store;

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, error};

type ErrorHook = Box<dyn Fn(&TaskHandle, &SagaError)>;

/// Bookkeeping for a task that has not settled yet.
struct TaskRecord {
    handle: TaskHandle,
    parent: Option<TaskId>,
    children: Vec<TaskId>,

    /// `None` only while the task's body is being started.
    abort: Option<AbortHandle>,
}

struct Inner<S, A: Action> {
    store: Store<S, A>,
    tasks: RefCell<HashMap<TaskId, TaskRecord>>,
    next_id: Cell<u64>,
    on_error: Option<ErrorHook>,
}

/// Runs sagas and owns the task tree.
///
/// Every task started through the scheduler, directly with
/// [`run`](Self::run) or by another task's `Fork`, is recorded with its
/// parent and children until it settles. Cancelling a task cancels its whole
/// subtree, children first.
///
/// The scheduler spawns tasks on the runtime driving the current thread, so
/// [`run`](Self::run) must be called from inside
/// [`Runtime::block_on`](crate::Runtime::block_on).
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = Scheduler::new(store.clone());
/// let root = scheduler.run("root", root_saga)?;
///
/// store.dispatch(AppAction::StartDashboard);
/// ```
pub struct Scheduler<S, A: Action> {
    inner: Rc<Inner<S, A>>,
}

impl<S, A: Action> Clone for Scheduler<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: 'static, A: Action> Scheduler<S, A> {
    /// Creates a scheduler dispatching into `store`.
    pub fn new(store: Store<S, A>) -> Self {
        Self::builder(store).build()
    }

    /// Starts configuring a scheduler.
    pub fn builder(store: Store<S, A>) -> SchedulerBuilder<S, A> {
        SchedulerBuilder {
            store,
            on_error: None,
        }
    }

    /// The store effects read from and dispatch into.
    pub fn store(&self) -> &Store<S, A> {
        &self.inner.store
    }

    /// Starts `saga` as a root task.
    ///
    /// The saga runs immediately, up to its first suspension, before this
    /// returns: a `take` it starts with already sees the next dispatch. The
    /// rest runs on later runtime ticks.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::NoRuntime`] when called outside a running
    /// runtime.
    pub fn run(
        &self,
        name: impl Into<Cow<'static, str>>,
        saga: impl Saga<S, A>,
    ) -> SagaResult<TaskHandle> {
        self.spawn(name.into(), None, saga.boxed())
    }

    /// Cancels a task and every task below it.
    ///
    /// Cancelling a task that already settled does nothing.
    pub fn cancel(&self, task: &TaskHandle) {
        self.cancel_id(task.id());
    }

    /// Handle of a task that has not settled yet.
    pub fn task(&self, id: TaskId) -> Option<TaskHandle> {
        self.inner
            .tasks
            .borrow()
            .get(&id)
            .map(|record| record.handle.clone())
    }

    /// Parent of a live task, `None` for roots and unknown tasks.
    pub fn parent(&self, id: TaskId) -> Option<TaskId> {
        self.inner.tasks.borrow().get(&id)?.parent
    }

    /// Live children of a task, in the order they were forked.
    pub fn children(&self, id: TaskId) -> Vec<TaskHandle> {
        let tasks = self.inner.tasks.borrow();

        tasks
            .get(&id)
            .map(|record| {
                record
                    .children
                    .iter()
                    .filter_map(|child| tasks.get(child))
                    .map(|child| child.handle.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of tasks that have not settled yet.
    pub fn live_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Registers and starts a task.
    ///
    /// The record exists before the saga body is entered, so tasks the body
    /// starts synchronously are linked to it. The body is then polled once in
    /// place, which lets a forked `take` register before the forker resumes.
    pub(crate) fn spawn(
        &self,
        name: Cow<'static, str>,
        parent: Option<TaskId>,
        saga: BoxSaga<S, A>,
    ) -> SagaResult<TaskHandle> {
        if context::current().is_none() {
            return Err(SagaError::NoRuntime);
        }

        let id = TaskId::new(self.inner.next_id.get());
        self.inner.next_id.set(id.as_u64() + 1);

        let handle = TaskHandle::new(id, name);

        {
            let mut tasks = self.inner.tasks.borrow_mut();

            let parent = parent.filter(|parent| tasks.contains_key(parent));
            if let Some(record) = parent.and_then(|parent| tasks.get_mut(&parent)) {
                record.children.push(id);
            }

            tasks.insert(
                id,
                TaskRecord {
                    handle: handle.clone(),
                    parent,
                    children: Vec::new(),
                    abort: None,
                },
            );

            debug!(task = %id, name = handle.name(), parent = ?parent.map(|p| p.as_u64()), "task spawned");
        }

        let cx = SagaContext::new(self.clone(), handle.clone());
        let body = Lifecycle::new(handle.clone(), saga.start(cx));

        // Cancelled by a task its own start spawned.
        if handle.is_settled() {
            return Ok(handle);
        }

        // The body runs up to its first suspension inside this call, so it
        // may already have settled when `spawn_started` returns.
        let scheduler = self.clone();
        let abort = spawn_started(Box::pin(async move {
            let result = body.await;
            scheduler.finish(id, result);
        }));

        let Some(abort) = abort else {
            self.detach(id);
            return Err(SagaError::NoRuntime);
        };

        let orphaned = match self.inner.tasks.borrow_mut().get_mut(&id) {
            Some(record) => {
                record.abort = Some(abort);
                None
            }
            None => Some(abort),
        };

        // Settled during its first poll. A cancelled body is still parked in
        // the executor and is dropped here; a finished one is already gone.
        if let Some(abort) = orphaned {
            abort.abort();
        }

        Ok(handle)
    }

    /// Settles a task whose body returned.
    fn finish(&self, id: TaskId, result: SagaResult) {
        let Some(handle) = self.task(id) else {
            return;
        };

        match result {
            Ok(()) => {
                let Some(record) = self.detach(id) else {
                    return;
                };
                self.adopt(record.parent, &record.children);

                handle.settle(TaskOutcome::Completed);
                debug!(task = %id, name = handle.name(), "task completed");
            }
            Err(err) => {
                for child in self.child_ids(id) {
                    self.cancel_id(child);
                }
                self.detach(id);

                handle.settle(TaskOutcome::Failed(err.clone()));
                error!(task = %id, name = handle.name(), error = %err, "task failed");

                if let Some(hook) = &self.inner.on_error {
                    hook(&handle, &err);
                }
            }
        }
    }

    /// Cancels a task's subtree in post-order, then the task itself.
    fn cancel_id(&self, id: TaskId) {
        let Some(handle) = self.task(id) else {
            return;
        };

        for child in self.child_ids(id) {
            self.cancel_id(child);
        }

        let abort = self.detach(id).and_then(|record| record.abort);

        handle.settle(TaskOutcome::Cancelled);
        debug!(task = %id, name = handle.name(), "task cancelled");

        // The future is dropped here, unless it is the one being polled.
        if let Some(abort) = abort {
            abort.abort();
        }
    }

    fn child_ids(&self, id: TaskId) -> Vec<TaskId> {
        self.inner
            .tasks
            .borrow()
            .get(&id)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    /// Removes a task from the tree and from its parent's children.
    fn detach(&self, id: TaskId) -> Option<TaskRecord> {
        let mut tasks = self.inner.tasks.borrow_mut();
        let record = tasks.remove(&id)?;

        if let Some(parent) = record.parent.and_then(|parent| tasks.get_mut(&parent)) {
            parent.children.retain(|child| *child != id);
        }

        Some(record)
    }

    /// Hands the live children of a completed task to its parent, or makes
    /// them roots.
    fn adopt(&self, parent: Option<TaskId>, children: &[TaskId]) {
        let mut tasks = self.inner.tasks.borrow_mut();
        let parent = parent.filter(|parent| tasks.contains_key(parent));

        for child in children {
            if let Some(record) = tasks.get_mut(child) {
                record.parent = parent;
            }
        }

        if let Some(record) = parent.and_then(|parent| tasks.get_mut(&parent)) {
            record.children.extend_from_slice(children);
        }
    }
}

/// Configures a [`Scheduler`].
pub struct SchedulerBuilder<S, A: Action> {
    store: Store<S, A>,
    on_error: Option<ErrorHook>,
}

impl<S: 'static, A: Action> SchedulerBuilder<S, A> {
    /// Sets a hook called with every task that fails.
    ///
    /// The hook runs after the failure was logged and the task settled.
    pub fn on_error(mut self, hook: impl Fn(&TaskHandle, &SagaError) + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Scheduler<S, A> {
        Scheduler {
            inner: Rc::new(Inner {
                store: self.store,
                tasks: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
                on_error: self.on_error,
            }),
        }
    }
}
