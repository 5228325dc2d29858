#![allow(dead_code)]

use narratio::saga::SagaContext;
use narratio::{Action, Store, Subscription};

use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Action)]
pub enum AppAction {
    ButtonClicked,
    SetLog(String),
    Search(String),
    SetResult(Vec<String>),
    StartDashboard,
    StopDashboard,
    SetMessage(String),
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub logs: Vec<String>,
    pub results: Vec<String>,
    pub message: String,
    pub messages: Vec<String>,
}

pub type Ctx = SagaContext<AppState, AppAction>;

pub fn reducer(state: &AppState, action: &AppAction) -> AppState {
    let mut next = state.clone();

    match action {
        AppAction::SetLog(line) => next.logs.push(line.clone()),
        AppAction::SetResult(results) => next.results = results.clone(),
        AppAction::SetMessage(message) => {
            next.message = message.clone();
            next.messages.push(message.clone());
        }
        AppAction::ButtonClicked
        | AppAction::Search(_)
        | AppAction::StartDashboard
        | AppAction::StopDashboard => {}
    }

    next
}

pub fn app_store() -> Store<AppState, AppAction> {
    Store::new(AppState::default(), reducer)
}

/// Records every action dispatched to `store`.
pub fn record(store: &Store<AppState, AppAction>) -> (Arc<Mutex<Vec<AppAction>>>, Subscription) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();

    let subscription = store.subscribe(move |_, action| sink.lock().unwrap().push(action.clone()));

    (log, subscription)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
