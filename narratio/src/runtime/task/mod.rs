//! Asynchronous task primitives.
//!
//! This module defines how the runtime represents, schedules and executes
//! asynchronous tasks:
//! - task slot state,
//! - custom waker integration with the ready queue,
//! - join and abort handles,
//! - the [`spawn`] entry point.
//!
//! Saga tasks are built on top of these primitives by the
//! [`Scheduler`](crate::Scheduler); most applications only use [`spawn`]
//! for plain background futures.

pub(crate) mod handle;
pub(crate) mod state;
pub(crate) mod waker;

pub mod core;

pub(crate) use self::core::{LocalFuture, Task, spawn_started};
pub(crate) use handle::AbortHandle;

pub use self::core::spawn;
pub use handle::JoinHandle;
