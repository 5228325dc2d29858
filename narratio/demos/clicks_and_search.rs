//! Example: logging clicks with `take_every` and debounced search with
//! `take_latest`
//!
//! Run with `RUST_LOG=narratio=debug` to see the task tree at work.

use narratio::saga::{BoxError, BoxSaga, Saga, SagaContext, Scheduler, all, take_every, take_latest};
use narratio::time::sleep;
use narratio::{Action, SagaResult, Store};

use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Action)]
enum AppAction {
    ButtonClicked,
    SetLog(String),
    Search(String),
    SetResult(Vec<String>),
}

#[derive(Clone, Debug, Default)]
struct AppState {
    logs: Vec<String>,
    results: Vec<String>,
}

type Ctx = SagaContext<AppState, AppAction>;

fn reducer(state: &AppState, action: &AppAction) -> AppState {
    let mut next = state.clone();

    match action {
        AppAction::SetLog(line) => next.logs.push(line.clone()),
        AppAction::SetResult(results) => next.results = results.clone(),
        AppAction::ButtonClicked | AppAction::Search(_) => {}
    }

    next
}

/// Simulated backend search.
async fn search_todos(query: String) -> Result<Vec<String>, BoxError> {
    sleep(Duration::from_millis(80)).await;

    if query.is_empty() {
        return Err("empty query".into());
    }

    Ok(["write docs", "write tests", "review"]
        .into_iter()
        .filter(|todo| todo.contains(query.as_str()))
        .map(String::from)
        .collect())
}

async fn log_click(cx: Ctx, _action: AppAction) -> SagaResult {
    let clicks = cx.state().logs.len() + 1;
    cx.put(AppAction::SetLog(format!("Button clicked ({clicks})")))
        .await;
    Ok(())
}

async fn search(cx: Ctx, action: AppAction) -> SagaResult {
    let AppAction::Search(query) = action else {
        return Ok(());
    };

    // debounce
    cx.delay(Duration::from_millis(300)).await;

    let results = match cx.call("searchTodos", move || search_todos(query)).await {
        Ok(results) => results,
        Err(err) => {
            tracing::warn!(%err, "search failed");
            vec!["Search error".to_string()]
        }
    };

    cx.put(AppAction::SetResult(results)).await;
    Ok(())
}

fn root_saga() -> impl Saga<AppState, AppAction> {
    let watchers: Vec<BoxSaga<AppState, AppAction>> = vec![
        take_every("clicks", AppActionKind::ButtonClicked, log_click).boxed(),
        take_latest("search", AppActionKind::Search, search).boxed(),
    ];

    all(watchers)
}

#[narratio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Store::new(AppState::default(), reducer);
    let _subscription = store.subscribe(|_, action| println!("dispatched {}", action.kind()));

    let scheduler = Scheduler::new(store.clone());
    let root = match scheduler.run("root", root_saga()) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("could not start sagas: {err}");
            return;
        }
    };

    for _ in 0..3 {
        store.dispatch(AppAction::ButtonClicked);
        sleep(Duration::from_millis(10)).await;
    }

    // Typing "wri" one key at a time: only the last search completes.
    for query in ["w", "wr", "wri"] {
        store.dispatch(AppAction::Search(query.to_string()));
        sleep(Duration::from_millis(100)).await;
    }

    sleep(Duration::from_millis(500)).await;

    let state = store.state();
    println!("logs: {:?}", state.logs);
    println!("results: {:?}", state.results);

    scheduler.cancel(&root);
    println!("root task: {:?}", root.outcome());
}
