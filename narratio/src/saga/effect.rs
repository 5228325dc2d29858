use crate::action::{Action, IntoPattern, Pattern};
use crate::saga::context::{BoxSaga, Saga};
use crate::saga::task::{TaskHandle, TaskOutcome};
use crate::store::ActionChannel;

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A boxed future that is not required to be `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Error type accepted from `Call` targets.
pub type BoxError = Box<dyn StdError + Send + Sync>;

type CallResult = Result<Box<dyn Any>, BoxError>;

/// A deferred call: invoked when the effect is interpreted.
pub type CallFn = Box<dyn FnOnce() -> BoxFuture<'static, CallResult>>;

/// An inert description of one unit of work.
///
/// Building an `Effect` does nothing. It only runs once a task performs it
/// through [`SagaContext::perform`](crate::saga::SagaContext::perform), and
/// the task resumes with the matching [`Output`].
pub enum Effect<S, A: Action> {
    /// Run a function returning a future; resume with its value.
    Call {
        name: Cow<'static, str>,
        call: CallFn,
    },

    /// Dispatch an action to the store.
    Put(A),

    /// Wait for the next action matching a pattern.
    Take(Pattern<A>),

    /// Wait for the oldest action buffered in a channel.
    TakeFrom(ActionChannel<A>),

    /// Wait for a duration.
    Delay(Duration),

    /// Start a child task without waiting for it.
    Fork {
        name: Cow<'static, str>,
        saga: BoxSaga<S, A>,
    },

    /// Cancel a task and its subtree.
    Cancel(TaskHandle),

    /// Wait for a task to settle.
    Join(TaskHandle),

    /// Run effects concurrently and wait for all of them.
    All(Vec<Effect<S, A>>),
}

impl<S: 'static, A: Action> Effect<S, A> {
    /// Describes an asynchronous call.
    ///
    /// `name` identifies the call in logs and in the [`SagaError::Call`]
    /// raised when `f`'s future fails.
    ///
    /// [`SagaError::Call`]: crate::SagaError::Call
    pub fn call<T, E, F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        T: 'static,
        E: Into<BoxError> + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        let call: CallFn = Box::new(move || -> BoxFuture<'static, CallResult> {
            Box::pin(async move {
                f().await
                    .map(|value| Box::new(value) as Box<dyn Any>)
                    .map_err(Into::into)
            })
        });

        Effect::Call {
            name: name.into(),
            call,
        }
    }

    /// Describes a synchronous call.
    pub fn call_sync<T, E, F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        T: 'static,
        E: Into<BoxError> + 'static,
        F: FnOnce() -> Result<T, E> + 'static,
    {
        Self::call(name, move || std::future::ready(f()))
    }

    pub fn put(action: A) -> Self {
        Effect::Put(action)
    }

    pub fn take(pattern: impl IntoPattern<A>) -> Self {
        Effect::Take(pattern.into_pattern())
    }

    pub fn take_from(channel: &ActionChannel<A>) -> Self {
        Effect::TakeFrom(channel.clone())
    }

    pub fn delay(duration: Duration) -> Self {
        Effect::Delay(duration)
    }

    pub fn fork(name: impl Into<Cow<'static, str>>, saga: impl Saga<S, A>) -> Self {
        Effect::Fork {
            name: name.into(),
            saga: saga.boxed(),
        }
    }

    pub fn cancel(task: &TaskHandle) -> Self {
        Effect::Cancel(task.clone())
    }

    pub fn join(task: &TaskHandle) -> Self {
        Effect::Join(task.clone())
    }

    pub fn all(effects: impl IntoIterator<Item = Effect<S, A>>) -> Self {
        Effect::All(effects.into_iter().collect())
    }
}

impl<S, A: Action> Effect<S, A> {
    /// The kind of this effect.
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Call { .. } => EffectKind::Call,
            Effect::Put(_) => EffectKind::Put,
            Effect::Take(_) => EffectKind::Take,
            Effect::TakeFrom(_) => EffectKind::TakeFrom,
            Effect::Delay(_) => EffectKind::Delay,
            Effect::Fork { .. } => EffectKind::Fork,
            Effect::Cancel(_) => EffectKind::Cancel,
            Effect::Join(_) => EffectKind::Join,
            Effect::All(_) => EffectKind::All,
        }
    }
}

impl<S, A: Action + fmt::Debug> fmt::Debug for Effect<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Call { name, .. } => f.debug_struct("Call").field("name", name).finish(),
            Effect::Put(action) => f.debug_tuple("Put").field(action).finish(),
            Effect::Take(pattern) => f.debug_tuple("Take").field(pattern).finish(),
            Effect::TakeFrom(channel) => f.debug_tuple("TakeFrom").field(&channel.len()).finish(),
            Effect::Delay(duration) => f.debug_tuple("Delay").field(duration).finish(),
            Effect::Fork { name, .. } => f.debug_struct("Fork").field("name", name).finish(),
            Effect::Cancel(task) => f.debug_tuple("Cancel").field(task).finish(),
            Effect::Join(task) => f.debug_tuple("Join").field(task).finish(),
            Effect::All(effects) => f.debug_tuple("All").field(effects).finish(),
        }
    }
}

/// Tag identifying an [`Effect`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Call,
    Put,
    Take,
    TakeFrom,
    Delay,
    Fork,
    Cancel,
    Join,
    All,
}

impl EffectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectKind::Call => "call",
            EffectKind::Put => "put",
            EffectKind::Take => "take",
            EffectKind::TakeFrom => "take_from",
            EffectKind::Delay => "delay",
            EffectKind::Fork => "fork",
            EffectKind::Cancel => "cancel",
            EffectKind::Join => "join",
            EffectKind::All => "all",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value a task resumes with after performing an [`Effect`].
pub enum Output<A> {
    /// `Put`, `Delay` and `Cancel`.
    Unit,

    /// The value returned by a `Call`.
    Value(Box<dyn Any>),

    /// The action received by `Take` or `TakeFrom`.
    Action(A),

    /// The task started by `Fork`.
    Task(TaskHandle),

    /// How the task awaited by `Join` settled.
    Outcome(TaskOutcome),

    /// The outputs of `All`, in the order the effects were listed.
    All(Vec<Output<A>>),
}

impl<A> Output<A> {
    /// Extracts a `Call` result of type `T`.
    pub fn into_value<T: 'static>(self) -> Option<T> {
        match self {
            Output::Value(value) => value.downcast::<T>().ok().map(|value| *value),
            _ => None,
        }
    }

    pub fn into_action(self) -> Option<A> {
        match self {
            Output::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn into_task(self) -> Option<TaskHandle> {
        match self {
            Output::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn into_outcome(self) -> Option<TaskOutcome> {
        match self {
            Output::Outcome(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn into_all(self) -> Option<Vec<Output<A>>> {
        match self {
            Output::All(outputs) => Some(outputs),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Output::Unit)
    }
}

impl<A: fmt::Debug> fmt::Debug for Output<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Unit => f.write_str("Unit"),
            Output::Value(_) => f.write_str("Value(..)"),
            Output::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Output::Task(task) => f.debug_tuple("Task").field(task).finish(),
            Output::Outcome(outcome) => f.debug_tuple("Outcome").field(outcome).finish(),
            Output::All(outputs) => f.debug_tuple("All").field(outputs).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Tick;

    impl Action for Tick {
        type Kind = ();

        fn kind(&self) {}
    }

    #[test]
    fn kinds_of_nested_effects() {
        let effect: Effect<(), Tick> = Effect::all([
            Effect::delay(Duration::from_millis(5)),
            Effect::put(Tick),
            Effect::call_sync("answer", || Ok::<_, BoxError>(42)),
        ]);

        assert_eq!(effect.kind(), EffectKind::All);
        match effect {
            Effect::All(effects) => {
                let kinds: Vec<_> = effects.iter().map(Effect::kind).collect();
                assert_eq!(kinds, [EffectKind::Delay, EffectKind::Put, EffectKind::Call]);
            }
            other => panic!("unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn output_accessors() {
        let value: Output<Tick> = Output::Value(Box::new(7u8));
        assert_eq!(value.into_value::<u8>(), Some(7));

        let wrong: Output<Tick> = Output::Value(Box::new(7u8));
        assert_eq!(wrong.into_value::<u32>(), None);

        assert!(Output::<Tick>::Unit.is_unit());
        assert!(Output::<Tick>::Unit.into_action().is_none());
    }
}
