//! Tube Queue RS - an in-memory task queue organised into named tubes
//!
//! Producers `put` opaque payloads with an integer priority, consumers `take`
//! the highest priority task (blocking with an optional timeout) and then
//! either `delete` it once done or `release` it back to the tube.

/// Configuration management for the queue engine and harness
pub mod config;
/// Tubes, the tube registry and the ready/lease bookkeeping
pub mod queue;
/// Task records and task handlers
pub mod task;
/// Consumer workers and the worker pool
pub mod worker;

pub use config::Config;
pub use queue::registry::TubeRegistry;
pub use queue::tube::{Tube, TubeOptions, TubeStats};
pub use task::{Task, TaskId, TaskState};
pub use worker::pool::WorkerPool;

use thiserror::Error;

/// Result type for tube queue operations
pub type Result<T> = std::result::Result<T, TubeQueueError>;

/// Error types for the tube queue
#[derive(Error, Debug)]
pub enum TubeQueueError {
    /// No tube is registered under the given name, or the tube was closed
    #[error("Tube not found: {0}")]
    TubeNotFound(String),

    /// Task with the specified ID is unknown, deleted, or in the wrong state
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Caller supplied an argument the engine cannot accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Tube already holds as many outstanding tasks as it allows
    #[error("Tube {tube} is full (capacity {capacity})")]
    TubeFull {
        /// Name of the full tube
        tube: String,
        /// Configured capacity
        capacity: usize,
    },

    /// Task handler failed or timed out
    #[error("Task execution failed: {0}")]
    ExecutionFailed(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Worker pool encountered an error
    #[error("Worker pool error: {0}")]
    WorkerPoolError(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
