use crate::action::{Action, Pattern};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Actions delivered to one waiter and not consumed yet.
struct Mailbox<A> {
    queue: VecDeque<A>,
    waker: Option<Waker>,
}

impl<A> Mailbox<A> {
    fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            queue: VecDeque::new(),
            waker: None,
        }))
    }
}

/// A registration waiting for matching actions.
struct Waiter<A: Action> {
    id: u64,
    pattern: Pattern<A>,
    mailbox: Arc<Mutex<Mailbox<A>>>,

    /// One-shot waiters leave the bus after their first delivery.
    persistent: bool,
}

struct Waiters<A: Action> {
    /// Registrations in FIFO order.
    list: VecDeque<Waiter<A>>,
    next_id: u64,
}

/// Ordered, synchronous publish point for actions.
///
/// The bus keeps every pending `take` and every open [`ActionChannel`] in
/// registration order. Publishing an action offers it to each of them in that
/// order; every matching waiter receives its own clone, and one-shot waiters
/// are removed as they are served.
pub(crate) struct ActionBus<A: Action> {
    waiters: Mutex<Waiters<A>>,
}

impl<A: Action> ActionBus<A> {
    pub(crate) fn new() -> Self {
        Self {
            waiters: Mutex::new(Waiters {
                list: VecDeque::new(),
                next_id: 0,
            }),
        }
    }

    fn register(&self, pattern: Pattern<A>, persistent: bool) -> (u64, Arc<Mutex<Mailbox<A>>>) {
        let mut waiters = self.waiters.lock();

        let id = waiters.next_id;
        waiters.next_id += 1;

        let mailbox = Mailbox::new();
        waiters.list.push_back(Waiter {
            id,
            pattern,
            mailbox: mailbox.clone(),
            persistent,
        });

        (id, mailbox)
    }

    fn deregister(&self, id: u64) {
        let removed = {
            let mut waiters = self.waiters.lock();
            let index = waiters.list.iter().position(|waiter| waiter.id == id);
            index.and_then(|index| waiters.list.remove(index))
        };

        drop(removed);
    }

    /// Delivers `action` to every matching waiter.
    ///
    /// Wakers are invoked after the bus lock is released, so a woken task
    /// polled on another thread never contends with the publisher.
    pub(crate) fn publish(&self, action: &A) {
        let mut wakers = Vec::new();

        {
            let mut waiters = self.waiters.lock();

            waiters.list.retain(|waiter| {
                if !waiter.pattern.matches(action) {
                    return true;
                }

                let mut mailbox = waiter.mailbox.lock();
                mailbox.queue.push_back(action.clone());
                wakers.extend(mailbox.waker.take());

                waiter.persistent
            });
        }

        for waker in wakers {
            waker.wake();
        }
    }

    /// Number of registered waiters.
    pub(crate) fn len(&self) -> usize {
        self.waiters.lock().list.len()
    }

    /// Returns a future resolving with the next action matching `pattern`.
    pub(crate) fn take(self: &Arc<Self>, pattern: Pattern<A>) -> Take<A> {
        Take {
            bus: self.clone(),
            pattern: Some(pattern),
            registration: None,
        }
    }

    /// Opens a persistent, buffered registration for `pattern`.
    pub(crate) fn channel(self: &Arc<Self>, pattern: Pattern<A>) -> ActionChannel<A> {
        let (id, mailbox) = self.register(pattern, true);

        ActionChannel {
            inner: Arc::new(ChannelInner {
                bus: self.clone(),
                id,
                mailbox,
            }),
        }
    }
}

/// Pops the next action of `mailbox`, or remembers `cx`'s waker.
fn poll_mailbox<A>(mailbox: &Mutex<Mailbox<A>>, cx: &mut Context<'_>) -> Poll<A> {
    let mut mailbox = mailbox.lock();

    match mailbox.queue.pop_front() {
        Some(action) => Poll::Ready(action),
        None => {
            mailbox.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

/// Future returned by [`Store::take`](crate::Store::take).
///
/// The waiter is registered on first poll, so only actions dispatched after
/// that point can satisfy it. Dropping the future removes the registration.
pub struct Take<A: Action> {
    bus: Arc<ActionBus<A>>,
    pattern: Option<Pattern<A>>,
    registration: Option<(u64, Arc<Mutex<Mailbox<A>>>)>,
}

impl<A: Action> Unpin for Take<A> {}

impl<A: Action> Future for Take<A> {
    type Output = A;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<A> {
        let this = self.get_mut();

        if let Some(pattern) = this.pattern.take() {
            let (id, mailbox) = this.bus.register(pattern, false);
            mailbox.lock().waker = Some(cx.waker().clone());
            this.registration = Some((id, mailbox));

            return Poll::Pending;
        }

        match &this.registration {
            Some((_, mailbox)) => poll_mailbox(mailbox, cx),
            None => Poll::Pending,
        }
    }
}

impl<A: Action> Drop for Take<A> {
    fn drop(&mut self) {
        if let Some((id, _)) = self.registration.take() {
            self.bus.deregister(id);
        }
    }
}

struct ChannelInner<A: Action> {
    bus: Arc<ActionBus<A>>,
    id: u64,
    mailbox: Arc<Mutex<Mailbox<A>>>,
}

impl<A: Action> Drop for ChannelInner<A> {
    fn drop(&mut self) {
        self.bus.deregister(self.id);
    }
}

/// A persistent, buffered subscription to the actions matching a pattern.
///
/// Unlike a one-shot `take`, a channel receives every matching action from
/// the moment it is opened until its last clone is dropped, buffering them
/// in dispatch order. Watchers read from a channel so that actions
/// dispatched while they are busy forking a handler are not lost.
///
/// Clones share the same buffer; a channel is meant to have one reader at a
/// time.
pub struct ActionChannel<A: Action> {
    inner: Arc<ChannelInner<A>>,
}

impl<A: Action> Clone for ActionChannel<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Action> ActionChannel<A> {
    /// Waits for the oldest buffered action.
    pub fn take(&self) -> ChannelTake<'_, A> {
        ChannelTake { channel: self }
    }

    /// Pops the oldest buffered action without waiting.
    pub fn try_take(&self) -> Option<A> {
        self.inner.mailbox.lock().queue.pop_front()
    }

    /// Number of buffered actions.
    pub fn len(&self) -> usize {
        self.inner.mailbox.lock().queue.len()
    }

    /// Returns `true` if no action is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Future returned by [`ActionChannel::take`].
pub struct ChannelTake<'a, A: Action> {
    channel: &'a ActionChannel<A>,
}

impl<A: Action> Future for ChannelTake<'_, A> {
    type Output = A;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<A> {
        poll_mailbox(&self.channel.inner.mailbox, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    #[derive(Clone, Debug, PartialEq)]
    enum Ev {
        Ping(u32),
        Pong,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum EvKind {
        Ping,
        Pong,
    }

    impl Action for Ev {
        type Kind = EvKind;

        fn kind(&self) -> EvKind {
            match self {
                Ev::Ping(_) => EvKind::Ping,
                Ev::Pong => EvKind::Pong,
            }
        }
    }

    fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
        let mut cx = Context::from_waker(Waker::noop());
        Pin::new(future).poll(&mut cx)
    }

    #[test]
    fn take_is_one_shot() {
        let bus = Arc::new(ActionBus::<Ev>::new());
        let mut take = bus.take(Pattern::kind(EvKind::Ping));

        assert!(poll_once(&mut take).is_pending());
        assert_eq!(bus.len(), 1);

        bus.publish(&Ev::Pong);
        assert!(poll_once(&mut take).is_pending());

        bus.publish(&Ev::Ping(1));
        bus.publish(&Ev::Ping(2));
        assert_eq!(bus.len(), 0);
        assert_eq!(poll_once(&mut take), Poll::Ready(Ev::Ping(1)));
    }

    #[test]
    fn every_matching_waiter_gets_its_own_copy() {
        let bus = Arc::new(ActionBus::<Ev>::new());
        let mut first = bus.take(Pattern::any());
        let mut second = bus.take(Pattern::kind(EvKind::Pong));

        let _ = poll_once(&mut first);
        let _ = poll_once(&mut second);

        bus.publish(&Ev::Pong);

        assert_eq!(poll_once(&mut first), Poll::Ready(Ev::Pong));
        assert_eq!(poll_once(&mut second), Poll::Ready(Ev::Pong));
    }

    #[test]
    fn waiters_are_woken_in_registration_order() {
        struct Recorder {
            id: usize,
            log: Arc<Mutex<Vec<usize>>>,
        }

        impl std::task::Wake for Recorder {
            fn wake(self: Arc<Self>) {
                self.log.lock().push(self.id);
            }
        }

        let bus = Arc::new(ActionBus::<Ev>::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut takes: Vec<_> = (0..3).map(|_| bus.take(Pattern::kind(EvKind::Ping))).collect();
        for (id, take) in takes.iter_mut().enumerate() {
            let waker = Waker::from(Arc::new(Recorder {
                id,
                log: log.clone(),
            }));
            let mut cx = Context::from_waker(&waker);
            assert!(Pin::new(take).poll(&mut cx).is_pending());
        }

        bus.publish(&Ev::Ping(7));

        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert!(takes.iter_mut().all(|take| poll_once(take) == Poll::Ready(Ev::Ping(7))));
    }

    #[test]
    fn dropping_a_take_deregisters_it() {
        let bus = Arc::new(ActionBus::<Ev>::new());
        let mut take = bus.take(Pattern::any());
        let _ = poll_once(&mut take);

        drop(take);
        assert_eq!(bus.len(), 0);
    }

    #[test]
    fn channel_buffers_until_dropped() {
        let bus = Arc::new(ActionBus::<Ev>::new());
        let channel = bus.channel(Pattern::kind(EvKind::Ping));

        bus.publish(&Ev::Ping(1));
        bus.publish(&Ev::Pong);
        bus.publish(&Ev::Ping(2));

        assert_eq!(channel.len(), 2);
        assert_eq!(channel.try_take(), Some(Ev::Ping(1)));

        let mut next = channel.take();
        assert_eq!(poll_once(&mut next), Poll::Ready(Ev::Ping(2)));

        let clone = channel.clone();
        drop(channel);
        assert_eq!(bus.len(), 1);

        drop(clone);
        assert_eq!(bus.len(), 0);
    }
}
