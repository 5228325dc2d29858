use crate::runtime::context;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Waits until `duration` has elapsed.
///
/// This is what the `Delay` effect awaits. Dropping the future before it
/// completes clears its timer.
///
/// # Panics
///
/// Panics if polled outside of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// sleep(Duration::from_millis(500)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    sleep_until(Instant::now() + duration)
}

/// Waits until `deadline` is reached.
///
/// A deadline in the past completes on the first poll without touching the
/// timer heap.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        timer: None,
    }
}

/// Future returned by [`sleep`] and [`sleep_until`].
pub struct Sleep {
    deadline: Instant,

    /// Cancellation flag of the registered timer, set once polled.
    timer: Option<Arc<AtomicBool>>,
}

impl Sleep {
    /// The instant at which this sleep completes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns `true` once the deadline has passed.
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn clear_timer(&mut self) {
        if let Some(cancelled) = self.timer.take() {
            cancelled.store(true, Ordering::Release);
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if this.is_elapsed() {
            this.clear_timer();
            return Poll::Ready(());
        }

        // Runtime wakers are keyed by task, so the waker stored at
        // registration stays valid for the whole sleep.
        if this.timer.is_none() {
            let cancelled = Arc::new(AtomicBool::new(false));

            context::current()
                .expect("Sleep polled outside of runtime")
                .add_timer(this.deadline, cx.waker().clone(), cancelled.clone());

            this.timer = Some(cancelled);
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.clear_timer();
    }
}
