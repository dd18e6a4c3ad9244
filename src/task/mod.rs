/// Task handler and executor implementations
pub mod executor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a task within its tube
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of a task
///
/// `Ready -> Leased` on take, `Leased -> Ready` on release and
/// `Ready | Leased -> Deleted` on delete. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Waiting in the tube to be taken
    Ready,

    /// Handed to a consumer, not yet deleted or released
    Leased,

    /// Removed for good
    Deleted,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Deleted)
    }
}

/// A unit of work stored in a tube
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// Producer supplied data, never inspected by the queue
    pub payload: serde_json::Value,

    /// Higher values are taken first
    pub priority: i64,

    /// Current lifecycle state
    pub state: TaskState,

    /// Number of times the task has been leased
    pub lease_count: u32,

    /// Task creation timestamp
    pub created_at: DateTime<Utc>,

    /// Task last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new ready task with the given payload and priority
    pub fn new(payload: serde_json::Value, priority: i64) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            payload,
            priority,
            state: TaskState::Ready,
            lease_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark task as leased
    pub fn mark_leased(&mut self) {
        self.state = TaskState::Leased;
        self.lease_count += 1;
        self.updated_at = Utc::now();
    }

    /// Mark task as ready again
    pub fn mark_ready(&mut self) {
        self.state = TaskState::Ready;
        self.updated_at = Utc::now();
    }

    /// Mark task as deleted
    pub fn mark_deleted(&mut self) {
        self.state = TaskState::Deleted;
        self.updated_at = Utc::now();
    }
}
