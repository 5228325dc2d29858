//! Sagas: cooperative, cancellable tasks driven by effects.
//!
//! A saga is an `async` body receiving a [`SagaContext`]. It talks to the
//! outside world only by performing [`Effect`]s (calling functions,
//! dispatching and waiting for actions, sleeping, forking and cancelling
//! other tasks) and resuming with their result.
//!
//! The [`Scheduler`] starts sagas as tasks on the current runtime and keeps
//! the tree of parent and child tasks, so that cancelling a task cancels
//! everything it started.
//!
//! ```rust,ignore
//! async fn dashboard(cx: SagaContext<AppState, AppAction>) -> SagaResult {
//!     loop {
//!         cx.take(AppActionKind::StartDashboard).await;
//!         let session = cx.fork("session", session).await?;
//!
//!         cx.take(AppActionKind::StopDashboard).await;
//!         cx.cancel(&session).await;
//!         cx.put(AppAction::SetMessage("Dashboard stopped".into())).await;
//!     }
//! }
//! ```

mod context;
mod effect;
mod interpret;
mod scheduler;
mod task;
mod watchers;

pub use context::{BoxSaga, Saga, SagaContext};
pub use effect::{BoxError, BoxFuture, CallFn, Effect, EffectKind, Output};
pub use interpret::Perform;
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use task::{TaskHandle, TaskId, TaskOutcome, TaskState};
pub use watchers::{all, take_every, take_latest};
