//! Core runtime components.
//!
//! This module contains the single-threaded executor the saga scheduler runs
//! on. It is responsible for:
//! - executing asynchronous tasks cooperatively on one thread,
//! - driving timers,
//! - providing runtime context to deeply nested components,
//! - enabling cooperative multitasking via yielding.
//!
//! Most users only touch [`RuntimeBuilder`](crate::RuntimeBuilder),
//! [`Runtime::block_on`] and the `#[narratio::main]` / `#[narratio::test]`
//! attributes.

mod core;
mod executor;
mod queue;
mod timer;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::Runtime;
