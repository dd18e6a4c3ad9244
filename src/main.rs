//! Tube Queue RS binary entry point
//!
//! Runs the engine through the put/take round-trip and priority scenarios
//! and reports timings, exiting non-zero if any check fails.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tube_queue_rs::task::executor::TaskHandler;
use tube_queue_rs::{Config, Task, TaskId, TubeQueueError, TubeRegistry, WorkerPool};

/// Records every task id it is handed
#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<TaskId>>,
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn handle(&self, task: &Task) -> tube_queue_rs::Result<()> {
        self.seen.lock().push(task.id.clone());
        Ok(())
    }
}

fn put_random(
    registry: &TubeRegistry,
    tube: &str,
    count: usize,
) -> tube_queue_rs::Result<Vec<TaskId>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let payload = serde_json::json!([i, {"dict": true, "buffer": "big string"}]);
            registry.put(tube, payload, rng.gen_range(0..=100))
        })
        .collect()
}

fn mismatch(scenario: &str, detail: String) -> TubeQueueError {
    TubeQueueError::ExecutionFailed(format!("{scenario} scenario failed: {detail}"))
}

async fn simple_scenario(registry: &TubeRegistry, task_count: usize) -> tube_queue_rs::Result<()> {
    let tube = "simple_test";
    registry.create_tube(tube, None)?;

    let start = Instant::now();
    let uploaded = put_random(registry, tube, task_count)?;
    info!("[simple] put {} tasks in {:?}", task_count, start.elapsed());

    let start = Instant::now();
    let mut taken = Vec::with_capacity(task_count);
    for _ in 0..task_count {
        match registry.take(tube, None).await? {
            Some(task) => taken.push(task.id),
            None => break,
        }
    }
    info!("[simple] took {} tasks in {:?}", taken.len(), start.elapsed());

    let uploaded: HashSet<_> = uploaded.into_iter().collect();
    let taken: HashSet<_> = taken.into_iter().collect();
    if uploaded != taken {
        return Err(mismatch(
            "simple",
            format!(
                "{} ids uploaded but never taken, {} ids taken but never uploaded",
                uploaded.difference(&taken).count(),
                taken.difference(&uploaded).count()
            ),
        ));
    }

    for id in &taken {
        registry.delete(tube, id)?;
    }
    Ok(())
}

async fn priority_scenario(
    registry: &TubeRegistry,
    task_count: usize,
) -> tube_queue_rs::Result<()> {
    let tube = "priority_test";
    registry.create_tube(tube, None)?;

    let start = Instant::now();
    put_random(registry, tube, task_count)?;
    info!("[priority] put {} tasks in {:?}", task_count, start.elapsed());

    let start = Instant::now();
    let mut last = i64::MAX;
    for _ in 0..task_count / 3 {
        let Some(task) = registry.take(tube, Some(std::time::Duration::ZERO)).await? else {
            return Err(mismatch("priority", "tube drained early".to_string()));
        };
        if task.priority > last {
            return Err(mismatch(
                "priority",
                format!("priority {} taken after {}", task.priority, last),
            ));
        }
        last = task.priority;
    }
    info!("[priority] took {} tasks in {:?}", task_count / 3, start.elapsed());

    let stats = registry.stats(tube)?;
    info!("[priority] stats: {}", serde_json::to_string(&stats)?);
    Ok(())
}

async fn pool_scenario(registry: &TubeRegistry, config: &Config) -> tube_queue_rs::Result<()> {
    let tube_name = "pool_test";
    let tube = registry.create_tube(tube_name, None)?;
    let uploaded: HashSet<_> = put_random(registry, tube_name, config.task_count)?
        .into_iter()
        .collect();

    let handler = Arc::new(RecordingHandler::default());
    let mut pool = WorkerPool::with_config(config.clone());

    let start = Instant::now();
    pool.start(Arc::clone(&tube), handler.clone()).await?;
    while !tube.is_empty() {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    pool.shutdown(config.shutdown_timeout()).await?;
    info!(
        "[pool] {} workers drained {} tasks in {:?}",
        pool.worker_count(),
        config.task_count,
        start.elapsed()
    );

    let seen = handler.seen.lock().clone();
    let unique: HashSet<_> = seen.iter().cloned().collect();
    if seen.len() != unique.len() || unique != uploaded {
        return Err(mismatch(
            "pool",
            format!(
                "{} handled, {} unique, {} uploaded",
                seen.len(),
                unique.len(),
                uploaded.len()
            ),
        ));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Tube Queue RS self-check");

    let config = Config::load()?;
    info!(
        "Initialized with {} workers, {} tasks per scenario, tube capacity {}",
        config.worker_count, config.task_count, config.max_tasks_per_tube
    );

    let registry = TubeRegistry::from_config(&config);

    let result: tube_queue_rs::Result<()> = async {
        simple_scenario(&registry, config.task_count).await?;
        priority_scenario(&registry, config.task_count).await?;
        pool_scenario(&registry, &config).await
    }
    .await;

    if let Err(e) = result {
        error!("{e}");
        return Err(e.into());
    }

    info!("All scenarios passed on tubes {:?}", registry.tube_names());
    Ok(())
}
