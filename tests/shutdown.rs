//! Admission gate, drain/cancel shutdown and concurrency limits.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rstest::rstest;
use taskgate::{
    CallFn, Config, EventKind, ManagerState, RuntimeError, ShutdownMode, SubmitError, TaskContext,
    TaskError, TaskFn, TaskManager, TaskSpec,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use common::Journal;

fn sleeper(name: &'static str, dur: Duration) -> TaskSpec<dyn taskgate::Task> {
    TaskSpec::new(TaskFn::arc(name, move |_ctx: TaskContext| async move {
        tokio::time::sleep(dur).await;
        Ok::<(), TaskError>(())
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drain_waits_for_running_task_and_its_observers() {
    let manager = TaskManager::new(Config::default()).expect("runtime");
    let journal = Journal::new();
    let started = Arc::new(Notify::new());

    let spec = TaskSpec::new(TaskFn::arc("export", {
        let started = Arc::clone(&started);
        move |_ctx: TaskContext| {
            let started = Arc::clone(&started);
            async move {
                started.notify_one();
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<(), TaskError>(())
            }
        }
    }));
    let handle = manager
        .submit(journal.observe(spec, "export"))
        .expect("admitted");

    started.notified().await;
    manager.close().await.expect("close");

    assert!(handle.is_closed());
    assert_eq!(journal.entries(), vec!["export:closed"]);
    assert_eq!(manager.in_flight(), 0);
    assert_eq!(manager.state(), ManagerState::Closed);
}

#[tokio::test]
async fn submit_after_close_fails_and_body_never_runs() {
    let manager = TaskManager::new(Config::default()).expect("runtime");
    manager.close().await.expect("close");

    let ran = Arc::new(AtomicUsize::new(0));
    let journal = Journal::new();
    let r = Arc::clone(&ran);
    let spec = TaskSpec::new(TaskFn::arc("late", move |_ctx: TaskContext| {
        let r = Arc::clone(&r);
        async move {
            r.fetch_add(1, Ordering::SeqCst);
            Ok::<(), TaskError>(())
        }
    }));

    let err = manager
        .submit(journal.observe(spec, "late"))
        .expect_err("closed");
    assert_eq!(err, SubmitError::Closed);
    assert!(!err.is_retryable());

    let value = manager.submit_value(TaskSpec::value(CallFn::arc(
        "late-value",
        |_ctx: TaskContext| async { Ok::<u8, TaskError>(1) },
    )));
    assert!(matches!(value, Err(SubmitError::Closed)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn close_is_idempotent() {
    let manager = TaskManager::new(Config::default()).expect("runtime");
    manager
        .submit(sleeper("tick", Duration::from_millis(30)))
        .expect("admitted");

    let (a, b) = tokio::join!(manager.close(), manager.close());
    assert!(a.is_ok());
    assert!(b.is_ok());
    manager.close().await.expect("third close");
    manager
        .close_with(ShutdownMode::Cancel)
        .await
        .expect("fourth close");
    assert!(manager.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submit_and_close_never_lose_a_task() {
    let manager = TaskManager::new(Config::default()).expect("runtime");
    let closed = Arc::new(AtomicUsize::new(0));
    let admitted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let mut submitters = Vec::new();
    for worker in 0..4 {
        let manager = Arc::clone(&manager);
        let (closed, admitted, rejected) = (
            Arc::clone(&closed),
            Arc::clone(&admitted),
            Arc::clone(&rejected),
        );
        submitters.push(tokio::spawn(async move {
            for i in 0..200 {
                let c = Arc::clone(&closed);
                let spec = TaskSpec::new(TaskFn::arc(
                    format!("w{worker}-{i}"),
                    |_ctx: TaskContext| async {
                        tokio::task::yield_now().await;
                        Ok::<(), TaskError>(())
                    },
                ))
                .on_closed(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                });
                match manager.submit(spec) {
                    Ok(_) => admitted.fetch_add(1, Ordering::SeqCst),
                    Err(SubmitError::Closed) => rejected.fetch_add(1, Ordering::SeqCst),
                    Err(other) => panic!("unexpected rejection: {other}"),
                };
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::sleep(Duration::from_millis(2)).await;
    manager.close().await.expect("close");

    for s in submitters {
        s.await.expect("submitter");
    }
    assert_eq!(
        admitted.load(Ordering::SeqCst) + rejected.load(Ordering::SeqCst),
        800
    );
    assert_eq!(closed.load(Ordering::SeqCst), admitted.load(Ordering::SeqCst));
    assert_eq!(manager.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_close_still_finishes_shutdown() {
    let manager = TaskManager::new(Config::default()).expect("runtime");
    manager
        .submit(sleeper("export", Duration::from_millis(200)))
        .expect("admitted");

    let first = tokio::time::timeout(Duration::from_millis(20), manager.close()).await;
    assert!(first.is_err());
    assert_eq!(manager.state(), ManagerState::Closing);

    tokio::time::timeout(Duration::from_secs(2), manager.close())
        .await
        .expect("second close returns")
        .expect("close");
    assert_eq!(manager.state(), ManagerState::Closed);
    assert_eq!(manager.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn grace_overrun_waits_for_cancelled_observers() {
    let cfg = Config {
        grace: Duration::from_millis(50),
        ..Config::default()
    };
    let manager = TaskManager::new(cfg).expect("runtime");
    let journal = Journal::new();

    let spec = TaskSpec::new(TaskFn::arc("reindex", |_ctx: TaskContext| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok::<(), TaskError>(())
    }));
    manager
        .submit(journal.observe(spec, "reindex"))
        .expect("admitted");

    let res = manager.close().await;
    assert!(matches!(res, Err(RuntimeError::GraceExceeded { .. })));
    assert_eq!(manager.in_flight(), 0);
    assert_eq!(
        journal.entries(),
        vec!["reindex:failed:task_canceled", "reindex:closed"]
    );
}

#[tokio::test]
async fn cancel_mode_reports_cancellation() {
    let manager = TaskManager::new(Config::default()).expect("runtime");
    let journal = Journal::new();

    let spec = TaskSpec::value(CallFn::arc("crawl", |ctx: TaskContext| async move {
        ctx.cancelled().await;
        Err::<(), _>(TaskError::Canceled)
    }));
    let handle = manager
        .submit_value(journal.observe(spec, "crawl"))
        .expect("admitted");
    tokio::task::yield_now().await;

    manager
        .close_with(ShutdownMode::Cancel)
        .await
        .expect("close");
    assert_eq!(handle.join().await, Err(TaskError::Canceled));
    assert_eq!(
        journal.entries(),
        vec!["crawl:failed:task_canceled", "crawl:closed"]
    );
}

#[tokio::test]
async fn cancel_mode_skips_tasks_waiting_for_a_slot() {
    let manager = TaskManager::new(Config::single_threaded()).expect("runtime");
    let ran = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..3 {
        let ran = Arc::clone(&ran);
        let spec = TaskSpec::value(CallFn::arc(format!("queued-{i}"), move |ctx: TaskContext| {
            let ran = Arc::clone(&ran);
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                ctx.cancelled().await;
                Err::<(), _>(TaskError::Canceled)
            }
        }));
        handles.push(manager.submit_value(spec).expect("admitted"));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    manager
        .close_with(ShutdownMode::Cancel)
        .await
        .expect("close");
    for h in handles {
        assert_eq!(h.join().await, Err(TaskError::Canceled));
    }
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn grace_exceeded_cancels_stuck_tasks() {
    let cfg = Config {
        grace: Duration::from_millis(50),
        ..Config::default()
    };
    let manager = TaskManager::new(cfg).expect("runtime");
    let mut events = manager.subscribe();

    let handle = manager
        .submit(sleeper("stuck", Duration::from_secs(3600)))
        .expect("admitted");

    let err = manager.close().await.expect_err("grace exceeded");
    match err {
        RuntimeError::GraceExceeded { grace, stuck } => {
            assert_eq!(grace, Duration::from_millis(50));
            assert_eq!(stuck, vec!["stuck".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(manager.is_closed());
    assert_eq!(manager.in_flight(), 0);
    assert!(handle.is_closed());

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::GraceExceeded));
    assert!(kinds.contains(&EventKind::ManagerClosed));
}

#[rstest]
#[case::single_threaded(Config::single_threaded(), 1)]
#[case::fixed_pool(Config::fixed(3), 3)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bounded_pool_never_exceeds_limit(#[case] cfg: Config, #[case] limit: usize) {
    let manager = TaskManager::new(cfg).expect("runtime");
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..12 {
        let (running, peak) = (Arc::clone(&running), Arc::clone(&peak));
        let spec = TaskSpec::new(TaskFn::arc(format!("job-{i}"), move |_ctx: TaskContext| {
            let (running, peak) = (Arc::clone(&running), Arc::clone(&peak));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        }));
        manager.submit(spec).expect("admitted");
    }

    manager.close().await.expect("close");
    assert!(peak.load(Ordering::SeqCst) <= limit);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn single_threaded_runs_in_admission_order() {
    let manager = TaskManager::new(Config::single_threaded()).expect("runtime");
    let journal = Journal::new();

    for i in 0..5 {
        let j = journal.clone();
        manager
            .submit(TaskFn::arc(format!("step-{i}"), move |ctx: TaskContext| {
                let j = j.clone();
                async move {
                    j.push(ctx.name().to_string());
                    Ok::<(), TaskError>(())
                }
            }))
            .expect("admitted");
    }
    manager.close().await.expect("close");
    assert_eq!(
        journal.entries(),
        vec!["step-0", "step-1", "step-2", "step-3", "step-4"]
    );
}

#[tokio::test]
async fn max_pending_rejects_with_full() {
    let cfg = Config {
        max_pending: 2,
        ..Config::default()
    };
    let manager = TaskManager::new(cfg).expect("runtime");
    let gate = CancellationToken::new();

    let blocked = |name: &'static str| {
        let gate = gate.clone();
        TaskFn::arc(name, move |_ctx: TaskContext| {
            let gate = gate.clone();
            async move {
                gate.cancelled().await;
                Ok::<(), TaskError>(())
            }
        })
    };

    manager.submit(blocked("a")).expect("admitted");
    manager.submit(blocked("b")).expect("admitted");
    let err = manager.submit(blocked("c")).expect_err("full");
    assert_eq!(err, SubmitError::Full { capacity: 2 });
    assert!(err.is_retryable());
    assert_eq!(manager.in_flight_names(), vec!["a", "b"]);

    gate.cancel();
    manager.close().await.expect("close");
}

#[tokio::test]
async fn last_lease_release_closes_shared_manager() {
    let manager = TaskManager::new(Config::default()).expect("runtime");
    let catalog = manager.lease();
    let ontology = manager.lease();

    catalog.release().await.expect("release");
    assert!(manager.is_open());
    manager
        .submit(sleeper("still-open", Duration::from_millis(1)))
        .expect("admitted");

    ontology.release().await.expect("release");
    assert!(manager.is_closed());
}

#[test]
fn building_without_runtime_fails() {
    assert!(matches!(
        TaskManager::new(Config::default()),
        Err(RuntimeError::NoRuntime)
    ));
}
