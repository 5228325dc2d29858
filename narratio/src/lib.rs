//! # Narratio
//!
//! **Narratio** is an effect-driven concurrency coordinator: saga-style
//! middleware for a single state [`Store`].
//!
//! Long-lived tasks (sagas) wait for actions dispatched to the store,
//! perform asynchronous work, and feed the results back as new actions.
//! Sagas never perform side effects directly; they describe them as
//! [`Effect`](saga::Effect)s and a small interpreter carries them out, which
//! makes every suspension point a place where the task can be cancelled.
//!
//! It provides:
//!
//! - A **store** with a pure reducer, subscribers and serialized dispatch
//! - **Effects**: call, put, take, delay, fork, cancel, join and all
//! - A **task tree** where cancelling a task cancels everything it forked
//! - **Watchers** like [`take_every`](saga::take_every) and
//!   [`take_latest`](saga::take_latest)
//! - A small **single-threaded runtime** with timers, and the
//!   `#[narratio::main]` / `#[narratio::test]` attributes to drive it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use narratio::saga::{Scheduler, SagaContext, take_latest};
//! use narratio::{Action, SagaResult, Store};
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug, Action)]
//! enum AppAction {
//!     Search(String),
//!     SetResult(String),
//! }
//!
//! async fn search(cx: SagaContext<String, AppAction>, action: AppAction) -> SagaResult {
//!     let AppAction::Search(query) = action else { return Ok(()) };
//!
//!     cx.delay(Duration::from_millis(500)).await;
//!     cx.put(AppAction::SetResult(format!("results for {query}"))).await;
//!     Ok(())
//! }
//!
//! #[narratio::main]
//! async fn main() {
//!     let store = Store::new(String::new(), |state: &String, action: &AppAction| match action {
//!         AppAction::SetResult(result) => result.clone(),
//!         _ => state.clone(),
//!     });
//!
//!     let scheduler = Scheduler::new(store.clone());
//!     scheduler
//!         .run("search", take_latest("search", AppActionKind::Search, search))
//!         .unwrap();
//!
//!     store.dispatch(AppAction::Search("ab".into()));
//!     store.dispatch(AppAction::Search("abc".into()));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`action`]: the `Action` trait and patterns
//! - [`store`]: the store and action channels
//! - [`saga`]: effects, tasks, the scheduler and watchers
//! - [`time`]: sleep and timeout
//! - [`task`]: spawning plain futures on the runtime

extern crate self as narratio;

mod error;
mod runtime;
mod utils;

pub mod action;
pub mod saga;
pub mod store;
pub mod time;

pub use action::{Action, IntoPattern, Pattern};
pub use error::{SagaError, SagaResult};
pub use runtime::Runtime;
pub use runtime::builder::RuntimeBuilder;
pub use runtime::task;
pub use runtime::yield_now::yield_now;
pub use store::{Store, Subscription};

pub use narratio_macros::{Action, main, test};
