//! Example: a dashboard that loads data, polls it, and stops on demand
//!
//! `START_DASHBOARD` forks a session that waits, loads the todos once and
//! then polls them every second. `STOP_DASHBOARD` cancels the whole session,
//! poller included, wherever it happens to be.

use narratio::saga::{BoxError, SagaContext, Scheduler};
use narratio::time::sleep;
use narratio::{Action, SagaResult, Store};

use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Action)]
enum DashboardAction {
    StartDashboard,
    StopDashboard,
    SetMessage(String),
}

#[derive(Clone, Debug, Default)]
struct DashboardState {
    message: String,
}

type Ctx = SagaContext<DashboardState, DashboardAction>;

fn reducer(state: &DashboardState, action: &DashboardAction) -> DashboardState {
    match action {
        DashboardAction::SetMessage(message) => DashboardState {
            message: message.clone(),
        },
        _ => state.clone(),
    }
}

/// Simulated `GET /todos`.
async fn fetch_todos(round: u32) -> Result<usize, BoxError> {
    sleep(Duration::from_millis(150)).await;
    Ok(3 + round as usize)
}

async fn poll_todos(cx: Ctx) -> SagaResult {
    let mut round = 1;

    loop {
        let todos = cx.call("fetchTodos", move || fetch_todos(round)).await?;
        cx.put(DashboardAction::SetMessage(format!(
            "Polling ({round}): {todos} todos"
        )))
        .await;

        round += 1;
        cx.delay(Duration::from_secs(1)).await;
    }
}

async fn session(cx: Ctx) -> SagaResult {
    cx.put(DashboardAction::SetMessage("Loading...".into())).await;
    cx.delay(Duration::from_millis(500)).await;

    let todos = cx.call("fetchTodos", || fetch_todos(0)).await?;
    cx.put(DashboardAction::SetMessage(format!("Loaded {todos} todos")))
        .await;

    let poller = cx.fork("poller", poll_todos).await?;
    cx.join(&poller).await;
    Ok(())
}

async fn dashboard(cx: Ctx) -> SagaResult {
    loop {
        cx.take(DashboardActionKind::StartDashboard).await;
        let session = cx.fork("session", session).await?;

        cx.take(DashboardActionKind::StopDashboard).await;
        cx.cancel(&session).await;
        cx.put(DashboardAction::SetMessage("Dashboard stopped".into()))
            .await;
    }
}

#[narratio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Store::new(DashboardState::default(), reducer);
    let _subscription = store.subscribe(|state, _| println!("{}", state.message));

    let scheduler = Scheduler::new(store.clone());
    if let Err(err) = scheduler.run("dashboard", dashboard) {
        eprintln!("could not start the dashboard: {err}");
        return;
    }

    store.dispatch(DashboardAction::StartDashboard);
    sleep(Duration::from_millis(3200)).await;
    store.dispatch(DashboardAction::StopDashboard);

    // Nothing polls anymore.
    sleep(Duration::from_secs(2)).await;

    // A second session stopped before it finished loading.
    store.dispatch(DashboardAction::StartDashboard);
    sleep(Duration::from_millis(200)).await;
    store.dispatch(DashboardAction::StopDashboard);

    sleep(Duration::from_millis(100)).await;
    println!("live tasks: {}", scheduler.live_tasks());
}
