//! Long-lived sagas reacting to every matching action.

use crate::action::{Action, IntoPattern};
use crate::error::SagaResult;
use crate::saga::context::{BoxSaga, Saga, SagaContext};
use crate::saga::task::TaskHandle;
use crate::store::ActionChannel;

use std::borrow::Cow;
use std::future::Future;
use std::rc::Rc;

/// Forks `handler` for every action matching `pattern`.
///
/// Handlers run concurrently and independently: a new match never cancels a
/// handler that is still running, and a failing handler does not stop the
/// watcher. Each handler task is named `name`.
///
/// The watcher reads from an [`ActionChannel`] opened when it starts, so
/// actions dispatched while it is busy forking are queued rather than
/// missed.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.run("clicks", take_every("log_click", AppActionKind::ButtonClicked, log_click))?;
/// ```
pub fn take_every<S, A, P, H, Fut>(
    name: impl Into<Cow<'static, str>>,
    pattern: P,
    handler: H,
) -> impl Saga<S, A>
where
    S: 'static,
    A: Action,
    P: IntoPattern<A>,
    H: Fn(SagaContext<S, A>, A) -> Fut + 'static,
    Fut: Future<Output = SagaResult> + 'static,
{
    let name = name.into();
    let pattern = pattern.into_pattern();

    move |cx: SagaContext<S, A>| {
        let channel = cx.channel(pattern);
        every_loop(cx, name, channel, Rc::new(handler))
    }
}

async fn every_loop<S, A, H, Fut>(
    cx: SagaContext<S, A>,
    name: Cow<'static, str>,
    channel: ActionChannel<A>,
    handler: Rc<H>,
) -> SagaResult
where
    S: 'static,
    A: Action,
    H: Fn(SagaContext<S, A>, A) -> Fut + 'static,
    Fut: Future<Output = SagaResult> + 'static,
{
    loop {
        let action = cx.take_from(&channel).await;
        let handler = handler.clone();

        cx.fork(name.clone(), move |cx: SagaContext<S, A>| handler(cx, action)).await?;
    }
}

/// Forks `handler` for every action matching `pattern`, cancelling the
/// previous handler if it is still running.
///
/// At most one handler of this watcher is alive at any time and the most
/// recent match always wins.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.run("search", take_latest("search", AppActionKind::Search, search))?;
/// ```
pub fn take_latest<S, A, P, H, Fut>(
    name: impl Into<Cow<'static, str>>,
    pattern: P,
    handler: H,
) -> impl Saga<S, A>
where
    S: 'static,
    A: Action,
    P: IntoPattern<A>,
    H: Fn(SagaContext<S, A>, A) -> Fut + 'static,
    Fut: Future<Output = SagaResult> + 'static,
{
    let name = name.into();
    let pattern = pattern.into_pattern();

    move |cx: SagaContext<S, A>| {
        let channel = cx.channel(pattern);
        latest_loop(cx, name, channel, Rc::new(handler))
    }
}

async fn latest_loop<S, A, H, Fut>(
    cx: SagaContext<S, A>,
    name: Cow<'static, str>,
    channel: ActionChannel<A>,
    handler: Rc<H>,
) -> SagaResult
where
    S: 'static,
    A: Action,
    H: Fn(SagaContext<S, A>, A) -> Fut + 'static,
    Fut: Future<Output = SagaResult> + 'static,
{
    let mut last: Option<TaskHandle> = None;

    loop {
        let action = cx.take_from(&channel).await;

        if let Some(previous) = last.take().filter(|task| !task.is_settled()) {
            cx.cancel(&previous).await;
        }

        let handler = handler.clone();
        last = Some(cx.fork(name.clone(), move |cx: SagaContext<S, A>| handler(cx, action)).await?);
    }
}

/// Runs several sagas side by side.
///
/// Each saga becomes a child task named `all[i]`, started as soon as the
/// combined task is. The combined task settles once every child has; a
/// failing child is reported like any failed task and leaves its siblings
/// running. Cancelling the combined task cancels all of them.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.run("root", all([watch_clicks.boxed(), watch_search.boxed()]))?;
/// ```
pub fn all<S, A>(sagas: impl IntoIterator<Item = BoxSaga<S, A>>) -> impl Saga<S, A>
where
    S: 'static,
    A: Action,
{
    let sagas: Vec<_> = sagas.into_iter().collect();

    move |cx: SagaContext<S, A>| {
        let children: SagaResult<Vec<TaskHandle>> = sagas
            .into_iter()
            .enumerate()
            .map(|(index, saga)| cx.spawn_child(format!("all[{index}]").into(), saga))
            .collect();

        join_children(cx, children)
    }
}

async fn join_children<S, A>(
    cx: SagaContext<S, A>,
    children: SagaResult<Vec<TaskHandle>>,
) -> SagaResult
where
    S: 'static,
    A: Action,
{
    for child in children? {
        cx.join(&child).await;
    }

    Ok(())
}
