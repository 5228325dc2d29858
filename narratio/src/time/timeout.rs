use crate::time::sleep::{Sleep, sleep_until};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned by [`timeout`] when the deadline passes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline has elapsed")]
pub struct Elapsed;

/// Requires a future to complete before `duration` has elapsed.
///
/// If the future completes first its output is returned in `Ok`; otherwise
/// the future is dropped when the `Timeout` is and `Err(Elapsed)` is
/// returned.
///
/// # Examples
///
/// ```rust,ignore
/// let result = timeout(Duration::from_millis(50), slow_call()).await;
/// assert!(result.is_err());
/// ```
pub fn timeout<F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future,
{
    timeout_at(Instant::now() + duration, future)
}

/// Requires a future to complete before `deadline`.
pub fn timeout_at<F>(deadline: Instant, future: F) -> Timeout<F>
where
    F: Future,
{
    Timeout {
        future,
        deadline: sleep_until(deadline),
    }
}

/// Future returned by [`timeout`].
pub struct Timeout<F> {
    future: F,
    deadline: Sleep,
}

impl<F> Timeout<F> {
    /// The wrapped future.
    pub fn get_ref(&self) -> &F {
        &self.future
    }
}

impl<F> Future for Timeout<F>
where
    F: Future,
{
    type Output = Result<F::Output, Elapsed>;

    /// Polls the inner future first, so a future that is ready exactly at
    /// the deadline still wins.
    ///
    /// # Safety
    ///
    /// The pin projections are sound: neither field is moved once the
    /// `Timeout` is pinned.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = unsafe { self.get_unchecked_mut() };

        let future = unsafe { Pin::new_unchecked(&mut this.future) };
        if let Poll::Ready(val) = future.poll(cx) {
            return Poll::Ready(Ok(val));
        }

        if let Poll::Ready(()) = Pin::new(&mut this.deadline).poll(cx) {
            return Poll::Ready(Err(Elapsed));
        }

        Poll::Pending
    }
}
