use crate::action::{Action, IntoPattern};
use crate::error::{SagaError, SagaResult};
use crate::saga::effect::{BoxError, BoxFuture, Effect, EffectKind, Output};
use crate::saga::interpret::{JoinTask, Perform, interpret};
use crate::saga::scheduler::Scheduler;
use crate::saga::task::{TaskHandle, TaskOutcome};
use crate::store::{ActionChannel, Store};
use crate::time::sleep;

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A saga: the body of a task.
///
/// Any `FnOnce(SagaContext<S, A>) -> impl Future<Output = SagaResult>` is a
/// saga, so plain `async fn`s and closures returning `async` blocks can be
/// started or forked directly.
///
/// Starting a saga calls it synchronously; only the returned future is
/// deferred. Work done before the first `.await` (such as opening an action
/// channel) therefore happens as soon as the task is spawned.
pub trait Saga<S, A: Action>: 'static {
    fn start(self: Box<Self>, cx: SagaContext<S, A>) -> BoxFuture<'static, SagaResult>;

    /// Boxes the saga, for heterogeneous lists such as [`all`](crate::saga::all).
    fn boxed(self) -> BoxSaga<S, A>
    where
        Self: Sized,
    {
        Box::new(self)
    }
}

/// A type-erased saga.
pub type BoxSaga<S, A> = Box<dyn Saga<S, A>>;

impl<S, A, F, Fut> Saga<S, A> for F
where
    S: 'static,
    A: Action,
    F: FnOnce(SagaContext<S, A>) -> Fut + 'static,
    Fut: Future<Output = SagaResult> + 'static,
{
    fn start(self: Box<Self>, cx: SagaContext<S, A>) -> BoxFuture<'static, SagaResult> {
        Box::pin((*self)(cx))
    }
}

/// Handle given to a running saga.
///
/// Every method performing an effect returns a future that must be
/// `.await`ed; once the task has been cancelled those futures never
/// resolve, so a cancelled saga stops at its next effect.
///
/// # Examples
///
/// ```rust,ignore
/// async fn fetch_todo(cx: SagaContext<AppState, AppAction>) -> SagaResult {
///     let message = match cx.call("fetchTodo", api::fetch_todo).await {
///         Ok(todo) => todo.title,
///         Err(_) => "Error fetching data".to_string(),
///     };
///
///     cx.put(AppAction::SetMessage(message)).await;
///     Ok(())
/// }
/// ```
pub struct SagaContext<S, A: Action> {
    scheduler: Scheduler<S, A>,
    task: TaskHandle,
}

impl<S, A: Action> Clone for SagaContext<S, A> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            task: self.task.clone(),
        }
    }
}

impl<S: 'static, A: Action> SagaContext<S, A> {
    pub(crate) fn new(scheduler: Scheduler<S, A>, task: TaskHandle) -> Self {
        Self { scheduler, task }
    }

    /// The task running this saga.
    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    pub fn store(&self) -> &Store<S, A> {
        self.scheduler.store()
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<S> {
        self.scheduler.store().state()
    }

    /// Opens a buffered channel receiving every action matching `pattern`
    /// from now on.
    pub fn channel(&self, pattern: impl IntoPattern<A>) -> ActionChannel<A> {
        self.scheduler.store().channel(pattern)
    }

    fn guard<T>(&self, kind: EffectKind, future: BoxFuture<'static, T>) -> Perform<T> {
        Perform::new(self.task.clone(), kind, future)
    }

    /// Performs any effect and resumes with its output.
    pub fn perform(&self, effect: Effect<S, A>) -> Perform<SagaResult<Output<A>>> {
        let kind = effect.kind();
        self.guard(kind, interpret(&self.scheduler, &self.task, effect))
    }

    /// Calls `f` and waits for the future it returns.
    ///
    /// An error from the future is returned as [`SagaError::Call`] so the
    /// saga can recover from it.
    pub fn call<T, E, F, Fut>(
        &self,
        name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Perform<SagaResult<T>>
    where
        T: 'static,
        E: Into<BoxError> + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        let name = name.into();

        self.guard(
            EffectKind::Call,
            Box::pin(async move { f().await.map_err(|err| SagaError::call(name, err)) }),
        )
    }

    /// Calls a synchronous function.
    pub fn call_sync<T, E, F>(
        &self,
        name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Perform<SagaResult<T>>
    where
        T: 'static,
        E: Into<BoxError> + 'static,
        F: FnOnce() -> Result<T, E> + 'static,
    {
        self.call(name, move || std::future::ready(f()))
    }

    /// Dispatches an action.
    pub fn put(&self, action: A) -> Perform<()> {
        let store = self.store().clone();
        self.guard(EffectKind::Put, Box::pin(async move { store.dispatch(action) }))
    }

    /// Waits for the next action matching `pattern`.
    ///
    /// Only actions dispatched after this future is first polled count.
    pub fn take(&self, pattern: impl IntoPattern<A>) -> Perform<A> {
        self.guard(EffectKind::Take, Box::pin(self.store().take(pattern)))
    }

    /// Waits for the oldest action buffered in `channel`.
    pub fn take_from(&self, channel: &ActionChannel<A>) -> Perform<A> {
        let channel = channel.clone();
        self.guard(
            EffectKind::TakeFrom,
            Box::pin(async move { channel.take().await }),
        )
    }

    /// Waits for `duration`.
    pub fn delay(&self, duration: Duration) -> Perform<()> {
        self.guard(EffectKind::Delay, Box::pin(async move { sleep(duration).await }))
    }

    /// Starts `saga` as a child of this task and resumes right away with its
    /// handle.
    ///
    /// The child runs up to its first suspension before this task resumes,
    /// so an action put right after the fork reaches a child waiting on it.
    pub fn fork(
        &self,
        name: impl Into<Cow<'static, str>>,
        saga: impl Saga<S, A>,
    ) -> Perform<SagaResult<TaskHandle>> {
        self.fork_boxed(name.into(), saga.boxed())
    }

    pub(crate) fn fork_boxed(
        &self,
        name: Cow<'static, str>,
        saga: BoxSaga<S, A>,
    ) -> Perform<SagaResult<TaskHandle>> {
        let scheduler = self.scheduler.clone();
        let parent = self.task.id();

        self.guard(
            EffectKind::Fork,
            Box::pin(async move { scheduler.spawn(name, Some(parent), saga) }),
        )
    }

    /// Starts `saga` as a child of this task outside of any effect.
    ///
    /// Used by combinators that must link their children while they are
    /// being started.
    pub(crate) fn spawn_child(
        &self,
        name: Cow<'static, str>,
        saga: BoxSaga<S, A>,
    ) -> SagaResult<TaskHandle> {
        self.scheduler.spawn(name, Some(self.task.id()), saga)
    }

    /// Cancels `task` and its subtree.
    ///
    /// A task cancelling itself, or one of its ancestors, stops here.
    pub fn cancel(&self, task: &TaskHandle) -> Perform<()> {
        let scheduler = self.scheduler.clone();
        let task = task.clone();

        self.guard(
            EffectKind::Cancel,
            Box::pin(async move { scheduler.cancel(&task) }),
        )
    }

    /// Waits for `task` to settle.
    pub fn join(&self, task: &TaskHandle) -> Perform<TaskOutcome> {
        self.guard(EffectKind::Join, Box::pin(JoinTask::new(task.clone())))
    }

    /// Runs `effects` concurrently and resumes with their outputs, in order.
    pub fn all(
        &self,
        effects: impl IntoIterator<Item = Effect<S, A>>,
    ) -> Perform<SagaResult<Vec<Output<A>>>> {
        let all = interpret(&self.scheduler, &self.task, Effect::all(effects));

        self.guard(
            EffectKind::All,
            Box::pin(async move { all.await.map(|output| output.into_all().unwrap_or_default()) }),
        )
    }
}
