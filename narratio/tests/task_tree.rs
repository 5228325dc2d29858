mod common;

use common::{AppAction, AppActionKind, Ctx, app_store};
use narratio::SagaResult;
use narratio::saga::{EffectKind, Scheduler, TaskHandle, TaskState};
use narratio::time::sleep;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Checks, when the parent's body is dropped, that its children were
/// already cancelled.
struct ChildrenCheck {
    children: Rc<RefCell<Vec<TaskHandle>>>,
    cancelled_first: Rc<Cell<bool>>,
}

impl Drop for ChildrenCheck {
    fn drop(&mut self) {
        let children = self.children.borrow();
        self.cancelled_first
            .set(!children.is_empty() && children.iter().all(TaskHandle::is_cancelled));
    }
}

async fn idle_child(cx: Ctx) -> SagaResult {
    cx.put(AppAction::SetLog("child up".into())).await;
    cx.take(AppActionKind::StopDashboard).await;
    cx.put(AppAction::SetLog("child down".into())).await;
    Ok(())
}

async fn parent(cx: Ctx, check: ChildrenCheck) -> SagaResult {
    let first = cx.fork("child-a", idle_child).await?;
    let second = cx.fork("child-b", idle_child).await?;
    check.children.borrow_mut().extend([first, second]);

    cx.put(AppAction::SetLog("parent up".into())).await;
    cx.take(AppActionKind::StopDashboard).await;
    cx.put(AppAction::SetLog("parent down".into())).await;

    drop(check);
    Ok(())
}

#[narratio::test]
async fn cancelling_a_parent_cancels_its_children_first() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let children = Rc::new(RefCell::new(Vec::new()));
    let cancelled_first = Rc::new(Cell::new(false));
    let check = ChildrenCheck {
        children: children.clone(),
        cancelled_first: cancelled_first.clone(),
    };

    let root = scheduler
        .run("parent", move |cx: Ctx| parent(cx, check))
        .unwrap();
    // Already parked on its `take`, children included.
    assert_eq!(root.state(), TaskState::Suspended);
    assert_eq!(root.pending_effect(), Some(EffectKind::Take));

    let live = scheduler.children(root.id());
    assert_eq!(live.len(), 2);
    assert_eq!(scheduler.parent(live[0].id()), Some(root.id()));
    assert!(live.iter().all(|child| child.state() == TaskState::Suspended));

    scheduler.cancel(&root);

    assert!(cancelled_first.get());
    assert_eq!(root.state(), TaskState::Cancelled);
    assert!(children.borrow().iter().all(|child| child.is_cancelled()));
    assert_eq!(scheduler.live_tasks(), 0);

    // Puts performed before the cancellation stay applied.
    assert_eq!(store.state().logs, vec!["child up", "child up", "parent up"]);

    store.dispatch(AppAction::StopDashboard);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(store.state().logs.len(), 3);
}

#[narratio::test]
async fn cancel_is_idempotent() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let task = scheduler.run("idle", idle_child).unwrap();
    sleep(Duration::from_millis(5)).await;

    scheduler.cancel(&task);
    scheduler.cancel(&task);

    assert!(task.outcome().is_some_and(|outcome| outcome.is_cancelled()));
}

async fn cancel_self(cx: Ctx) -> SagaResult {
    cx.put(AppAction::SetLog("before".into())).await;
    cx.cancel(cx.task()).await;
    cx.put(AppAction::SetLog("after".into())).await;
    Ok(())
}

#[narratio::test]
async fn a_task_cancelling_itself_stops_at_that_effect() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let task = scheduler.run("self", cancel_self).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(task.state(), TaskState::Cancelled);
    assert_eq!(store.state().logs, vec!["before"]);
    assert_eq!(scheduler.live_tasks(), 0);
}

async fn cancel_parent(cx: Ctx, parent: TaskHandle) -> SagaResult {
    cx.cancel(&parent).await;
    cx.put(AppAction::SetLog("unreachable".into())).await;
    Ok(())
}

async fn doomed_parent(cx: Ctx) -> SagaResult {
    let me = cx.task().clone();
    cx.fork("rebel", move |cx: Ctx| cancel_parent(cx, me)).await?;
    cx.take(AppActionKind::StopDashboard).await;
    Ok(())
}

#[narratio::test]
async fn a_child_can_cancel_its_ancestor() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let root = scheduler.run("parent", doomed_parent).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(root.is_cancelled());
    assert!(store.state().logs.is_empty());
    assert_eq!(scheduler.live_tasks(), 0);
}

async fn short_lived(cx: Ctx) -> SagaResult {
    cx.fork("orphan", idle_child).await?;
    Ok(())
}

async fn grandparent(cx: Ctx) -> SagaResult {
    let middle = cx.fork("middle", short_lived).await?;
    cx.join(&middle).await;
    cx.take(AppActionKind::StopDashboard).await;
    Ok(())
}

#[narratio::test]
async fn children_of_a_completed_task_are_adopted() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let root = scheduler.run("grandparent", grandparent).unwrap();
    sleep(Duration::from_millis(10)).await;

    let adopted = scheduler.children(root.id());
    assert_eq!(adopted.len(), 1);
    assert_eq!(adopted[0].name(), "orphan");
    assert_eq!(scheduler.parent(adopted[0].id()), Some(root.id()));

    scheduler.cancel(&root);
    assert!(adopted[0].is_cancelled());
}

async fn cancel_later(cx: Ctx, target: TaskHandle) -> SagaResult {
    cx.delay(Duration::from_millis(5)).await;
    cx.cancel(&target).await;
    Ok(())
}

async fn joiner(cx: Ctx) -> SagaResult {
    let child = cx.fork("child", idle_child).await?;

    let target = child.clone();
    cx.fork("canceller", move |cx: Ctx| cancel_later(cx, target))
        .await?;

    let outcome = cx.join(&child).await;
    let message = if outcome.is_cancelled() {
        "child cancelled"
    } else {
        "child finished"
    };

    cx.put(AppAction::SetLog(message.into())).await;
    Ok(())
}

#[narratio::test]
async fn joining_a_cancelled_task_reports_cancellation() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let root = scheduler.run("joiner", joiner).unwrap();
    sleep(Duration::from_millis(30)).await;

    assert_eq!(root.state(), TaskState::Completed);
    assert_eq!(store.state().logs, vec!["child up", "child cancelled"]);
}

async fn listener(cx: Ctx) -> SagaResult {
    cx.take(AppActionKind::ButtonClicked).await;
    cx.put(AppAction::SetLog("heard".into())).await;
    Ok(())
}

async fn fork_then_put(cx: Ctx) -> SagaResult {
    let child = cx.fork("listener", listener).await?;
    assert_eq!(child.pending_effect(), Some(EffectKind::Take));

    cx.put(AppAction::ButtonClicked).await;

    let outcome = cx.join(&child).await;
    assert!(outcome.is_completed());
    Ok(())
}

#[narratio::test]
async fn a_forked_child_hears_an_action_put_right_after_the_fork() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let root = scheduler.run("forker", fork_then_put).unwrap();
    sleep(Duration::from_millis(20)).await;

    assert_eq!(store.state().logs, vec!["heard"]);
    assert_eq!(root.state(), TaskState::Completed);
    assert_eq!(scheduler.live_tasks(), 0);
}

async fn wait_for_start(cx: Ctx) -> SagaResult {
    cx.take(AppActionKind::StartDashboard).await;
    cx.put(AppAction::SetLog("started".into())).await;
    Ok(())
}

#[narratio::test]
async fn a_root_task_hears_a_dispatch_made_right_after_run() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let root = scheduler.run("dashboard", wait_for_start).unwrap();
    assert_eq!(root.pending_effect(), Some(EffectKind::Take));

    store.dispatch(AppAction::StartDashboard);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(store.state().logs, vec!["started"]);
    assert!(root.outcome().is_some_and(|outcome| outcome.is_completed()));
}
