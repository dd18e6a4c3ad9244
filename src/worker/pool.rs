use crate::queue::tube::Tube;
use crate::task::executor::{Executor, TaskHandler};
use crate::worker::Worker;
use crate::Config;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// A pool of workers consuming one tube concurrently
pub struct WorkerPool {
    config: Config,
    tube: Option<Arc<Tube>>,
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl WorkerPool {
    /// Create a new worker pool with the specified number of workers
    pub fn new(worker_count: usize) -> Self {
        Self::with_config(Config::new(worker_count))
    }

    /// Create a worker pool sized and timed by `config`
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            tube: None,
            handles: Vec::new(),
            shutdown_tx: None,
        }
    }

    /// Start the worker pool
    pub async fn start(
        &mut self,
        tube: Arc<Tube>,
        handler: Arc<dyn TaskHandler>,
    ) -> crate::Result<()> {
        if self.is_running() {
            return Err(crate::TubeQueueError::WorkerPoolError(
                "Worker pool already running".to_string(),
            ));
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());
        let executor = Executor::new(handler, self.config.task_timeout_secs);

        info!(
            "Starting worker pool with {} workers on tube {}",
            self.config.worker_count,
            tube.name()
        );

        for i in 0..self.config.worker_count {
            let worker = Worker::new(i, executor.clone(), self.config.poll_interval());
            let tube = Arc::clone(&tube);
            let shutdown_rx = shutdown_tx.subscribe();

            let handle = tokio::spawn(async move {
                worker.run(tube, shutdown_rx).await;
            });

            self.handles.push(handle);
        }
        self.tube = Some(tube);

        Ok(())
    }

    /// Signal every worker to stop and wait up to `grace` for them to exit
    ///
    /// Workers blocked in `take` leave at once and hand back anything granted
    /// to them; a worker inside its handler finishes that task first. Fails
    /// when some worker is still running after `grace`.
    pub async fn shutdown(&mut self, grace: Duration) -> crate::Result<()> {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return Ok(());
        };
        let Some(tube) = self.tube.take() else {
            return Ok(());
        };
        let _ = shutdown_tx.send(());

        let handles = std::mem::take(&mut self.handles);
        let worker_count = handles.len();
        debug!(
            "Stopping {} workers on tube {} (grace {:?})",
            worker_count,
            tube.name(),
            grace
        );

        let stopped = timeout(grace, async {
            let mut panicked = 0;
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Worker on tube {} panicked: {}", tube.name(), e);
                    panicked += 1;
                }
            }
            panicked
        })
        .await;

        let stats = tube.stats();
        match stopped {
            Ok(panicked) => {
                info!(
                    "{} workers on tube {} stopped ({} panicked); {} tasks ready, {} leased",
                    worker_count,
                    tube.name(),
                    panicked,
                    stats.ready,
                    stats.leased
                );
                Ok(())
            }
            Err(_) => {
                warn!(
                    "Workers on tube {} still busy after {:?}; {} tasks leased",
                    tube.name(),
                    grace,
                    stats.leased
                );
                Err(crate::TubeQueueError::WorkerPoolError(format!(
                    "workers on tube {} still running after {:?}",
                    tube.name(),
                    grace
                )))
            }
        }
    }

    /// Get the number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Check if the pool is running
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }
}
