//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the runtime.
//! In particular, it exposes a generational [`Slab`] used to own task
//! futures behind small, copyable keys.

mod slab;

pub(crate) use slab::{Key, Slab};
