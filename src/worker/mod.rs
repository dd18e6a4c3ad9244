/// Worker pool implementation
pub mod pool;

use crate::queue::tube::Tube;
use crate::task::executor::Executor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// A consumer that takes tasks from a tube and settles each one
///
/// A task whose handler succeeds is deleted; a task whose handler fails or
/// times out is released back to the tube.
pub struct Worker {
    id: usize,
    executor: Executor,
    poll_interval: Duration,
}

impl Worker {
    /// Create a new worker with the given ID
    pub fn new(id: usize, executor: Executor, poll_interval: Duration) -> Self {
        Self {
            id,
            executor,
            poll_interval,
        }
    }

    /// Process tasks from `tube` until shutdown is signalled or the tube closes
    pub async fn run(&self, tube: Arc<Tube>, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Worker {} started on tube {}", self.id, tube.name());

        loop {
            let taken = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Worker {} received shutdown signal", self.id);
                    break;
                }
                taken = tube.take(Some(self.poll_interval)) => taken,
            };

            let task = match taken {
                Ok(Some(task)) => task,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Worker {} stopping: {}", self.id, e);
                    break;
                }
            };

            match self.executor.execute(&task).await {
                Ok(()) => {
                    if let Err(e) = tube.delete(&task.id) {
                        error!("Worker {} failed to delete task {}: {}", self.id, task.id, e);
                    }
                }
                Err(e) => {
                    warn!("Worker {} releasing task {}: {}", self.id, task.id, e);
                    if let Err(e) = tube.release(&task.id) {
                        error!("Worker {} failed to release task {}: {}", self.id, task.id, e);
                    }
                }
            }
        }

        info!("Worker {} stopped", self.id);
    }
}
