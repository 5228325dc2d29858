use crate::action::Action;
use crate::error::{SagaError, SagaResult};
use crate::saga::effect::{BoxFuture, Effect, EffectKind, Output};
use crate::saga::scheduler::Scheduler;
use crate::saga::task::{TaskHandle, TaskOutcome};
use crate::time::sleep;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// Builds the future carrying out `effect` on behalf of `task`.
///
/// Nothing happens until the returned future is polled: a `Put` dispatches,
/// a `Take` registers and a `Delay` starts its timer on first poll.
pub(crate) fn interpret<S: 'static, A: Action>(
    scheduler: &Scheduler<S, A>,
    task: &TaskHandle,
    effect: Effect<S, A>,
) -> BoxFuture<'static, SagaResult<Output<A>>> {
    match effect {
        Effect::Call { name, call } => Box::pin(async move {
            call()
                .await
                .map(Output::Value)
                .map_err(|err| SagaError::call(name, err))
        }),
        Effect::Put(action) => {
            let store = scheduler.store().clone();

            Box::pin(async move {
                store.dispatch(action);
                Ok(Output::Unit)
            })
        }
        Effect::Take(pattern) => {
            let take = scheduler.store().take(pattern);
            Box::pin(async move { Ok(Output::Action(take.await)) })
        }
        Effect::TakeFrom(channel) => {
            Box::pin(async move { Ok(Output::Action(channel.take().await)) })
        }
        Effect::Delay(duration) => Box::pin(async move {
            sleep(duration).await;
            Ok(Output::Unit)
        }),
        Effect::Fork { name, saga } => {
            let scheduler = scheduler.clone();
            let parent = task.id();

            Box::pin(async move { scheduler.spawn(name, Some(parent), saga).map(Output::Task) })
        }
        Effect::Cancel(target) => {
            let scheduler = scheduler.clone();

            Box::pin(async move {
                scheduler.cancel(&target);
                Ok(Output::Unit)
            })
        }
        Effect::Join(target) => Box::pin(async move {
            let outcome = JoinTask::new(target).await;
            Ok(Output::Outcome(outcome))
        }),
        Effect::All(effects) => {
            let branches = effects
                .into_iter()
                .map(|effect| interpret(scheduler, task, effect))
                .collect();

            Box::pin(AllFuture::new(task.clone(), branches))
        }
    }
}

/// Future returned by every effect a task performs.
///
/// It records the effect as the task's pending effect while it runs, and
/// stops a cancelled task at its suspension boundary: once the task is
/// cancelled the future never resolves, so the task body never observes the
/// result of the effect.
#[must_use = "effects do nothing unless `.await`ed"]
pub struct Perform<T> {
    task: TaskHandle,
    kind: EffectKind,
    future: BoxFuture<'static, T>,
    started: bool,
}

impl<T> Perform<T> {
    pub(crate) fn new(task: TaskHandle, kind: EffectKind, future: BoxFuture<'static, T>) -> Self {
        Self {
            task,
            kind,
            future,
            started: false,
        }
    }
}

impl<T> Future for Perform<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.task.is_cancelled() {
            return Poll::Pending;
        }

        if !self.started {
            self.started = true;
            self.task.set_pending(Some(self.kind));

            trace!(task = %self.task.id(), effect = %self.kind, "performing effect");
        }

        let output = match self.future.as_mut().poll(cx) {
            Poll::Ready(output) => output,
            Poll::Pending => return Poll::Pending,
        };

        // The effect itself may have cancelled this task or an ancestor.
        if self.task.is_cancelled() {
            return Poll::Pending;
        }

        self.task.set_pending(None);
        Poll::Ready(output)
    }
}

/// Waits for a task to settle.
pub(crate) struct JoinTask {
    task: TaskHandle,
}

impl JoinTask {
    pub(crate) fn new(task: TaskHandle) -> Self {
        Self { task }
    }
}

impl Future for JoinTask {
    type Output = TaskOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<TaskOutcome> {
        self.task.poll_join(cx)
    }
}

/// Runs every branch of an `All` effect concurrently.
///
/// Resolves with the outputs in branch order once every branch succeeded,
/// or with the first error, dropping the branches still pending.
struct AllFuture<A> {
    task: TaskHandle,
    branches: Vec<Option<BoxFuture<'static, SagaResult<Output<A>>>>>,
    outputs: Vec<Option<Output<A>>>,
}

impl<A> AllFuture<A> {
    fn new(task: TaskHandle, branches: Vec<BoxFuture<'static, SagaResult<Output<A>>>>) -> Self {
        let outputs = branches.iter().map(|_| None).collect();

        Self {
            task,
            branches: branches.into_iter().map(Some).collect(),
            outputs,
        }
    }
}

impl<A> Unpin for AllFuture<A> {}

impl<A> Future for AllFuture<A> {
    type Output = SagaResult<Output<A>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut failed = None;

        for (index, slot) in this.branches.iter_mut().enumerate() {
            if this.task.is_cancelled() {
                return Poll::Pending;
            }

            let Some(branch) = slot else {
                continue;
            };

            let poll = branch.as_mut().poll(cx);

            match poll {
                Poll::Ready(Ok(output)) => {
                    this.outputs[index] = Some(output);
                    *slot = None;
                }
                Poll::Ready(Err(err)) => {
                    failed = Some(err);
                    break;
                }
                Poll::Pending => {}
            }
        }

        if let Some(err) = failed {
            this.branches.clear();
            return Poll::Ready(Err(err));
        }

        if this.branches.iter().any(Option::is_some) {
            return Poll::Pending;
        }

        let outputs = this.outputs.drain(..).flatten().collect();
        Poll::Ready(Ok(Output::All(outputs)))
    }
}
