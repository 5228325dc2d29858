use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::task::Waker;
use std::time::Instant;

/// An entry in the runtime timer queue.
///
/// `TimerEntry` represents a scheduled wake-up at a specific deadline.
/// Entries live in a binary heap ordered by deadline, then by registration
/// order, so timers sharing a deadline fire in the order they were set.
///
/// The entry may be cancelled before it fires.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Registration sequence number, used as a tie-breaker.
    seq: u64,

    /// Waker to notify when the deadline is reached.
    waker: Waker,

    /// Cancellation flag shared with the associated sleep future.
    cancelled: Arc<AtomicBool>,
}

impl TimerEntry {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by `(deadline, seq)`.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry>`
    /// behaves as a min-heap, where the earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending timers owned by the runtime thread.
#[derive(Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

impl TimerQueue {
    /// Schedules `waker` to be woken at `deadline` unless `cancelled` is set
    /// first.
    pub(crate) fn insert(&mut self, deadline: Instant, waker: Waker, cancelled: Arc<AtomicBool>) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(TimerEntry {
            deadline,
            seq,
            waker,
            cancelled,
        });
    }

    /// Removes every timer whose deadline is at or before `now` and returns
    /// the wakers of those that were not cancelled, in firing order.
    ///
    /// Wakers are returned rather than woken so the caller can release its
    /// borrow of the queue first.
    pub(crate) fn expired(&mut self, now: Instant) -> Vec<Waker> {
        let mut wakers = Vec::new();

        while self.heap.peek().is_some_and(|entry| entry.deadline <= now) {
            match self.heap.pop() {
                Some(entry) if !entry.is_cancelled() => wakers.push(entry.waker),
                _ => {}
            }
        }

        wakers
    }

    /// Returns the earliest live deadline, discarding cancelled timers that
    /// sit at the top of the heap.
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(entry) = self.heap.peek() {
            if !entry.is_cancelled() {
                return Some(entry.deadline);
            }
            self.heap.pop();
        }

        None
    }

    /// Number of registered timers, cancelled ones included.
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}
