use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future behind [`yield_now`]: pending on its first poll, ready afterwards.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Lets every task that is already runnable take a turn before the caller
/// continues.
///
/// Dispatching an action only wakes the sagas waiting on it; they run on
/// the next executor tick. Code outside a saga, such as a test body driven
/// by `block_on`, awaits `yield_now` to let those sagas react once without
/// waiting on a timer. The caller is re-queued behind them, so a chain of
/// wake-ups longer than one tick needs more than one yield.
///
/// # Examples
///
/// ```rust,ignore
/// store.dispatch(AppAction::ButtonClicked);
/// yield_now().await;
/// assert_eq!(store.state().logs.len(), 1);
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
