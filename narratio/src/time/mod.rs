//! Time utilities driven by the runtime timer heap.
//!
//! It includes:
//! - [`sleep`] and [`sleep_until`] for suspending a task,
//! - [`timeout`] and [`timeout_at`] for bounding how long a future may run.
//!
//! The saga `Delay` effect is a [`Sleep`] under the hood.

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{Sleep, sleep, sleep_until};

#[doc(inline)]
pub use timeout::{Elapsed, Timeout, timeout, timeout_at};
