use narratio::time::{sleep, sleep_until, timeout, timeout_at};
use narratio::{RuntimeBuilder, task, yield_now};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[narratio::test]
async fn sleep_waits_at_least_the_duration() {
    let start = Instant::now();
    sleep(Duration::from_millis(30)).await;

    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[narratio::test]
async fn zero_sleep_is_immediate() {
    let start = Instant::now();
    sleep(Duration::ZERO).await;

    assert!(start.elapsed() < Duration::from_millis(10));
}

#[narratio::test]
async fn sleep_until_a_past_deadline_is_ready() {
    let deadline = Instant::now();
    sleep(Duration::from_millis(5)).await;

    let late = sleep_until(deadline);
    assert!(late.is_elapsed());
    late.await;
}

#[narratio::test]
async fn timeout_at_uses_an_absolute_deadline() {
    let deadline = Instant::now() + Duration::from_millis(20);

    let result = timeout_at(deadline, sleep(Duration::from_millis(200))).await;

    assert!(result.is_err());
    assert!(Instant::now() >= deadline);
}

#[narratio::test]
async fn timers_fire_in_deadline_order() {
    let order = Rc::new(RefCell::new(Vec::new()));

    let handles: Vec<_> = [30u64, 10, 20]
        .into_iter()
        .map(|ms| {
            let order = order.clone();
            task::spawn(async move {
                sleep(Duration::from_millis(ms)).await;
                order.borrow_mut().push(ms);
            })
        })
        .collect();

    for handle in handles {
        handle.await;
    }

    assert_eq!(*order.borrow(), vec![10, 20, 30]);
}

#[narratio::test]
async fn timeout_completes_before_deadline() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(10)).await;
        123
    });

    let result = timeout(Duration::from_millis(50), handle).await;

    assert_eq!(result, Ok(123));
}

#[narratio::test]
async fn timeout_expires() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(100)).await;
        456
    });

    let result = timeout(Duration::from_millis(20), handle).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().to_string(), "deadline has elapsed");
}

#[narratio::test]
async fn aborted_tasks_never_run_again() {
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();

    let handle = task::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        *flag.borrow_mut() = true;
    });

    yield_now().await;
    handle.abort();
    assert!(handle.is_finished());

    sleep(Duration::from_millis(30)).await;
    assert!(!*ran.borrow());
}

#[narratio::test]
async fn yield_now_lets_queued_tasks_run() {
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();

    let _handle = task::spawn(async move {
        *flag.borrow_mut() = true;
    });

    assert!(!*ran.borrow());
    yield_now().await;
    assert!(*ran.borrow());
}

#[test]
fn block_on_drives_spawned_tasks_with_a_small_budget() {
    let runtime = RuntimeBuilder::new().event_budget(1).build();

    let total = runtime.block_on(async {
        let handles: Vec<_> = (1..=10).map(|n| task::spawn(async move { n * 2 })).collect();

        let mut total = 0;
        for handle in handles {
            total += handle.await;
        }
        total
    });

    assert_eq!(total, 110);
    assert_eq!(runtime.live_tasks(), 0);
}

#[test]
fn dropping_the_runtime_drops_pending_tasks() {
    let dropped = Rc::new(RefCell::new(false));

    struct Flag(Rc<RefCell<bool>>);

    impl Drop for Flag {
        fn drop(&mut self) {
            *self.0.borrow_mut() = true;
        }
    }

    let runtime = RuntimeBuilder::new().build();
    let flag = Flag(dropped.clone());

    let _handle = runtime.spawn(async move {
        let _flag = flag;
        sleep(Duration::from_secs(60)).await;
    });

    runtime.block_on(yield_now());
    assert_eq!(runtime.live_tasks(), 1);

    drop(runtime);
    assert!(*dropped.borrow());
}

#[test]
#[should_panic(expected = "event_budget must be > 0")]
fn zero_event_budget_is_rejected() {
    let _ = RuntimeBuilder::new().event_budget(0);
}
