//! Executor

use crate::task::Task;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Trait for consumer side processing of a taken task
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Process a task. `Ok` deletes the task, `Err` releases it back to its tube.
    async fn handle(&self, task: &Task) -> crate::Result<()>;
}

/// Runs a [`TaskHandler`] with a per-task timeout
#[derive(Clone)]
pub struct Executor {
    handler: Arc<dyn TaskHandler>,
    timeout_duration: Duration,
}

impl Executor {
    /// Create a new executor around `handler`
    pub fn new(handler: Arc<dyn TaskHandler>, timeout_secs: u64) -> Self {
        Self {
            handler,
            timeout_duration: Duration::from_secs(timeout_secs),
        }
    }

    /// Run the handler for one task
    pub async fn execute(&self, task: &Task) -> crate::Result<()> {
        match timeout(self.timeout_duration, self.handler.handle(task)).await {
            Ok(Ok(())) => {
                debug!("Task {} handled", task.id);
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Task {} handler error: {e}", task.id);
                error!("{error_msg}");
                Err(crate::TubeQueueError::ExecutionFailed(error_msg))
            }
            Err(_) => {
                let error_msg = format!("Task {} timed out", task.id);
                warn!("{error_msg}");
                Err(crate::TubeQueueError::ExecutionFailed(error_msg))
            }
        }
    }
}
