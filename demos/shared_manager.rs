//! # Example: shared_manager
//!
//! Two components share one manager through leases; the last one to let go
//! closes it. A running task submits follow-up work through its context.
//!
//! ## Run
//! ```bash
//! cargo run --example shared_manager
//! ```

use std::time::Duration;

use taskgate::{CallFn, Config, ManagerLease, TaskContext, TaskError, TaskSpec, TaskManager};

async fn catalog(lease: ManagerLease) -> anyhow::Result<()> {
    let Some(manager) = lease.manager().cloned() else {
        return Ok(());
    };
    let datasets = manager
        .submit_value(TaskSpec::value(CallFn::arc("list-datasets", |ctx: TaskContext| async move {
            // Follow-up work goes through the same manager.
            let manager = ctx.manager().ok_or_else(|| TaskError::fail("manager gone"))?;
            let sizes = manager
                .submit_value(TaskSpec::value(CallFn::arc("dataset-sizes", |_ctx: TaskContext| async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<Vec<u64>, TaskError>(vec![10, 20, 30])
                })))
                .map_err(TaskError::fail)?
                .join()
                .await?;
            Ok::<usize, TaskError>(sizes.len())
        })))?
        .join()
        .await?;
    println!("[catalog] {datasets} datasets");
    lease.release().await?;
    Ok(())
}

async fn ontology(lease: ManagerLease) -> anyhow::Result<()> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("[ontology] done");
    lease.release().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let manager = TaskManager::new(Config::default())?;
    let (a, b) = (manager.lease(), manager.lease());

    tokio::try_join!(catalog(a), ontology(b))?;
    println!("[main] manager state: {:?}", manager.state());
    Ok(())
}
