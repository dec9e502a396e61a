//! # Example: graceful_close
//!
//! Demonstrates draining a manager while work is in flight.
//!
//! Shows how to:
//! - Submit fire-and-forget and value-producing tasks with observers
//! - Watch the event stream
//! - Close the manager on Ctrl-C or once the work is done
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► TaskManager::new(Config::fixed(2))
//!   ├─► submit 4 "index" tasks (2 run at a time)
//!   ├─► submit_value "count" and await its result
//!   └─► close() ─► waits for the remaining index tasks and their observers
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example graceful_close
//! ```

use std::time::Duration;

use taskgate::{CallFn, Config, TaskContext, TaskError, TaskFn, TaskManager, TaskSpec};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    // 1. Two slots, five second drain budget.
    let mut cfg = Config::fixed(2);
    cfg.grace = Duration::from_secs(5);
    let manager = TaskManager::new(cfg)?;

    // 2. Print every lifecycle event.
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            println!("[event #{}] {:?} task={:?}", ev.seq, ev.kind, ev.task);
        }
    });

    // 3. Index tasks that sleep for a while, one of them fails.
    for i in 0..4u64 {
        let spec = TaskSpec::new(TaskFn::arc(
            format!("index-{i}"),
            move |ctx: TaskContext| async move {
                tokio::time::sleep(Duration::from_millis(200 * (i + 1))).await;
                if i == 2 {
                    return Err(TaskError::fail(format!("{} hit a corrupt shard", ctx.name())));
                }
                Ok(())
            },
        ))
        .on_failed(|e: &TaskError| eprintln!("[observer] failure: {e}"))
        .on_closed(move || println!("[observer] index-{i} closed"));
        manager.submit(spec)?;
    }

    // 4. A value-producing task.
    let count = manager
        .submit_value(TaskSpec::value(CallFn::arc("count", |_ctx: TaskContext| async {
            Ok::<usize, TaskError>(4)
        })))?
        .join()
        .await?;
    println!("[main] count = {count}");

    // 5. Close on Ctrl-C, or as soon as the remaining work drained.
    tokio::select! {
        res = manager.close_on_signal() => res?,
        res = manager.close() => res?,
    }
    println!("[main] closed, in flight = {}", manager.in_flight());
    Ok(())
}
