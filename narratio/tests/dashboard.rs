mod common;

use common::{AppAction, AppActionKind, Ctx, app_store};
use narratio::SagaResult;
use narratio::saga::{BoxError, Scheduler};
use narratio::time::sleep;

use std::time::Duration;

const INITIAL_DELAY: Duration = Duration::from_millis(30);
const POLL_INTERVAL: Duration = Duration::from_millis(40);

async fn fetch_todos(round: u32) -> Result<String, BoxError> {
    Ok(format!("{round} todos"))
}

async fn poll_todos(cx: Ctx) -> SagaResult {
    let mut round = 1;

    loop {
        let todos = cx.call("fetchTodos", move || fetch_todos(round)).await?;
        cx.put(AppAction::SetMessage(format!("Polling ({round}): {todos}")))
            .await;

        round += 1;
        cx.delay(POLL_INTERVAL).await;
    }
}

async fn session(cx: Ctx) -> SagaResult {
    cx.delay(INITIAL_DELAY).await;

    let todos = cx.call("fetchTodos", || fetch_todos(0)).await?;
    cx.put(AppAction::SetMessage(format!("Loaded: {todos}"))).await;

    let poller = cx.fork("poller", poll_todos).await?;
    cx.join(&poller).await;
    Ok(())
}

async fn dashboard_flow(cx: Ctx) -> SagaResult {
    loop {
        cx.take(AppActionKind::StartDashboard).await;
        let session = cx.fork("session", session).await?;

        cx.take(AppActionKind::StopDashboard).await;
        cx.cancel(&session).await;
        cx.put(AppAction::SetMessage("Dashboard stopped".into())).await;
    }
}

#[narratio::test]
async fn dashboard_loads_polls_and_stops() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    let flow = scheduler.run("dashboard", dashboard_flow).unwrap();
    sleep(Duration::from_millis(5)).await;

    store.dispatch(AppAction::StartDashboard);
    sleep(Duration::from_millis(100)).await;

    let messages = store.state().messages.clone();
    assert_eq!(messages[0], "Loaded: 0 todos");
    assert_eq!(messages[1], "Polling (1): 1 todos");
    assert_eq!(messages[2], "Polling (2): 2 todos");

    store.dispatch(AppAction::StopDashboard);
    sleep(Duration::from_millis(5)).await;

    assert_eq!(store.state().message, "Dashboard stopped");
    assert!(scheduler.children(flow.id()).is_empty());
    assert_eq!(scheduler.live_tasks(), 1);

    let stopped = store.state().messages.len();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.state().messages.len(), stopped);
}

#[narratio::test]
async fn stopping_during_the_initial_delay_skips_loading() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    scheduler.run("dashboard", dashboard_flow).unwrap();
    sleep(Duration::from_millis(5)).await;

    store.dispatch(AppAction::StartDashboard);
    sleep(Duration::from_millis(10)).await;
    store.dispatch(AppAction::StopDashboard);

    sleep(Duration::from_millis(80)).await;
    assert_eq!(store.state().messages, vec!["Dashboard stopped"]);
}

#[narratio::test]
async fn dashboard_can_be_restarted() {
    let store = app_store();
    let scheduler = Scheduler::new(store.clone());

    scheduler.run("dashboard", dashboard_flow).unwrap();
    sleep(Duration::from_millis(5)).await;

    store.dispatch(AppAction::StartDashboard);
    sleep(Duration::from_millis(10)).await;
    store.dispatch(AppAction::StopDashboard);
    sleep(Duration::from_millis(5)).await;

    store.dispatch(AppAction::StartDashboard);
    sleep(Duration::from_millis(50)).await;

    assert_eq!(
        store.state().messages,
        vec!["Dashboard stopped", "Loaded: 0 todos", "Polling (1): 1 todos"]
    );
}
