//! Tube

use crate::queue::lease::LeaseTracker;
use crate::queue::ready::ReadyQueue;
use crate::task::{Task, TaskId, TaskState};
use crate::TubeQueueError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Options accepted when a tube is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeOptions {
    /// Maximum number of outstanding (ready + leased) tasks
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl TubeOptions {
    /// Options with a capacity limit
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }
}

/// Point-in-time view of a tube
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TubeStats {
    /// Tasks waiting to be taken
    pub ready: usize,
    /// Tasks taken but not yet deleted or released
    pub leased: usize,
    /// Blocked `take` calls
    pub waiting: usize,
    /// Total tasks put
    pub put: u64,
    /// Total successful takes
    pub taken: u64,
    /// Total deletes
    pub deleted: u64,
    /// Total releases
    pub released: u64,
    /// Age of the longest held lease in seconds
    pub oldest_lease_secs: Option<f64>,
}

#[derive(Debug, Default)]
struct Counters {
    put: u64,
    taken: u64,
    deleted: u64,
    released: u64,
}

/// A blocked `take` call; the sender is the single-assignment result slot
struct Waiter {
    id: u64,
    tx: oneshot::Sender<Task>,
}

struct TubeState {
    /// Every non-deleted task of the tube
    tasks: HashMap<TaskId, Task>,
    ready: ReadyQueue,
    leases: LeaseTracker,
    /// Blocked takers in arrival order
    waiters: VecDeque<Waiter>,
    next_waiter_id: u64,
    counters: Counters,
    closed: bool,
}

impl TubeState {
    fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            ready: ReadyQueue::new(),
            leases: LeaseTracker::new(),
            waiters: VecDeque::new(),
            next_waiter_id: 0,
            counters: Counters::default(),
            closed: false,
        }
    }

    /// Move the head ready task into the lease tracker
    fn lease_next(&mut self) -> Option<Task> {
        let (id, sequence) = self.ready.pop()?;
        let task = self.tasks.get_mut(&id)?;
        task.mark_leased();
        let task = task.clone();
        self.leases.lease(id, sequence);
        self.counters.taken += 1;
        Some(task)
    }

    /// Undo a lease that never reached a consumer, restoring the task's position
    fn unlease(&mut self, id: &TaskId) {
        let Some(lease) = self.leases.end(id) else {
            return;
        };
        if let Some(task) = self.tasks.get_mut(id) {
            task.mark_ready();
            task.lease_count = task.lease_count.saturating_sub(1);
            self.ready.restore(id.clone(), task.priority, lease.sequence);
            self.counters.taken = self.counters.taken.saturating_sub(1);
        }
    }

    /// Hand ready tasks to blocked takers, first arrived first served
    fn dispatch(&mut self) {
        while !self.ready.is_empty() {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.tx.is_closed() {
                continue;
            }
            let Some(task) = self.lease_next() else {
                self.waiters.push_front(waiter);
                break;
            };
            debug!("Task {} granted to waiter {}", task.id, waiter.id);
            if let Err(task) = waiter.tx.send(task) {
                self.unlease(&task.id);
            }
        }
    }

    fn remove_waiter(&mut self, waiter_id: u64) -> bool {
        match self.waiters.iter().position(|w| w.id == waiter_id) {
            Some(pos) => {
                self.waiters.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// A named queue of tasks with priority ordering, blocking take and leases
///
/// All state sits behind one mutex that is never held across an `.await`,
/// so operations on different tubes never contend.
pub struct Tube {
    name: String,
    options: TubeOptions,
    state: Mutex<TubeState>,
}

impl Tube {
    /// Create an empty tube
    pub fn new(name: impl Into<String>, options: TubeOptions) -> Self {
        Self {
            name: name.into(),
            options,
            state: Mutex::new(TubeState::new()),
        }
    }

    /// Tube name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options the tube was created with
    pub fn options(&self) -> &TubeOptions {
        &self.options
    }

    fn not_found(&self) -> TubeQueueError {
        TubeQueueError::TubeNotFound(self.name.clone())
    }

    /// Add a ready task and wake the longest waiting taker, if any
    pub fn put(&self, payload: serde_json::Value, priority: i64) -> crate::Result<TaskId> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(self.not_found());
        }
        if let Some(capacity) = self.options.capacity {
            if state.tasks.len() >= capacity {
                warn!("Tube {} rejected put: capacity {} reached", self.name, capacity);
                return Err(TubeQueueError::TubeFull {
                    tube: self.name.clone(),
                    capacity,
                });
            }
        }

        let task = Task::new(payload, priority);
        let id = task.id.clone();
        let sequence = state.ready.push(id.clone(), priority);
        state.tasks.insert(id.clone(), task);
        state.counters.put += 1;
        debug!(
            "Task {} put into tube {} with priority {} (sequence: {})",
            id, self.name, priority, sequence
        );

        state.dispatch();
        Ok(id)
    }

    /// Lease the highest priority ready task
    ///
    /// Waits for a `put` or `release` when the tube is empty. `None` waits
    /// forever; an elapsed timeout yields `Ok(None)`. Blocked callers are
    /// served in arrival order and every task goes to exactly one caller.
    /// Dropping the returned future before it completes gives back any task
    /// that was granted to it in the meantime.
    pub async fn take(&self, timeout: Option<Duration>) -> crate::Result<Option<Task>> {
        let pending = match self.try_take(timeout)? {
            Immediate::Taken(task) => return Ok(Some(task)),
            Immediate::Empty => return Ok(None),
            Immediate::Wait(pending) => pending,
        };
        pending.wait(timeout).await
    }

    fn try_take(&self, timeout: Option<Duration>) -> crate::Result<Immediate<'_>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(self.not_found());
        }
        if let Some(task) = state.lease_next() {
            debug!("Task {} taken from tube {}", task.id, self.name);
            return Ok(Immediate::Taken(task));
        }
        if timeout == Some(Duration::ZERO) {
            return Ok(Immediate::Empty);
        }

        let (tx, rx) = oneshot::channel();
        let waiter_id = state.next_waiter_id;
        state.next_waiter_id += 1;
        state.waiters.push_back(Waiter { id: waiter_id, tx });
        debug!("Waiter {} blocked on tube {}", waiter_id, self.name);

        Ok(Immediate::Wait(PendingTake {
            tube: self,
            waiter_id,
            rx,
            settled: false,
        }))
    }

    /// Permanently remove a ready or leased task
    pub fn delete(&self, id: &TaskId) -> crate::Result<Task> {
        let mut state = self.state.lock();
        let Some(mut task) = state.tasks.remove(id) else {
            warn!("Delete of unknown task {} in tube {}", id, self.name);
            return Err(TubeQueueError::TaskNotFound(id.to_string()));
        };
        match task.state {
            TaskState::Ready => {
                state.ready.remove(id);
            }
            TaskState::Leased => {
                state.leases.end(id);
            }
            TaskState::Deleted => {}
        }
        task.mark_deleted();
        state.counters.deleted += 1;
        debug!("Task {} deleted from tube {}", id, self.name);
        Ok(task)
    }

    /// Return a leased task to the back of its priority tier
    pub fn release(&self, id: &TaskId) -> crate::Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let priority = match state.tasks.get_mut(id) {
            Some(task) if task.state == TaskState::Leased => {
                task.mark_ready();
                task.priority
            }
            _ => {
                warn!("Release of task {} which is not leased in tube {}", id, self.name);
                return Err(TubeQueueError::TaskNotFound(id.to_string()));
            }
        };
        state.leases.end(id);
        let sequence = state.ready.push(id.clone(), priority);
        state.counters.released += 1;
        debug!(
            "Task {} released in tube {} (sequence: {})",
            id, self.name, sequence
        );

        state.dispatch();
        Ok(())
    }

    /// Head of the ready ordering, without leasing it
    pub fn peek(&self) -> Option<Task> {
        let mut state = self.state.lock();
        let id = state.ready.peek()?.clone();
        state.tasks.get(&id).cloned()
    }

    /// Snapshot of a ready or leased task
    pub fn get(&self, id: &TaskId) -> crate::Result<Task> {
        let state = self.state.lock();
        state
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| TubeQueueError::TaskNotFound(id.to_string()))
    }

    /// Number of outstanding (ready + leased) tasks
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Check if the tube holds no outstanding task
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts and counters for the tube
    pub fn stats(&self) -> TubeStats {
        let state = self.state.lock();
        TubeStats {
            ready: state.ready.len(),
            leased: state.leases.len(),
            waiting: state.waiters.len(),
            put: state.counters.put,
            taken: state.counters.taken,
            deleted: state.counters.deleted,
            released: state.counters.released,
            oldest_lease_secs: state.leases.oldest().map(|age| age.as_secs_f64()),
        }
    }

    /// Stop accepting puts and takes; blocked takers fail with `TubeNotFound`
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let woken = state.waiters.len();
        state.waiters.clear();
        info!("Tube {} closed, {} waiters woken", self.name, woken);
    }

    /// Has [`close`](Self::close) been called?
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

enum Immediate<'a> {
    Taken(Task),
    Empty,
    Wait(PendingTake<'a>),
}

/// Registration of a blocked taker
///
/// Settling (grant, timeout or drop) always happens under the tube lock, so
/// a taker either receives a task or leaves the wait queue, never both.
struct PendingTake<'a> {
    tube: &'a Tube,
    waiter_id: u64,
    rx: oneshot::Receiver<Task>,
    settled: bool,
}

impl PendingTake<'_> {
    async fn wait(mut self, timeout: Option<Duration>) -> crate::Result<Option<Task>> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.rx).await {
                Ok(received) => received,
                Err(_) => return self.settle_timeout(),
            },
            None => (&mut self.rx).await,
        };
        self.settled = true;
        match received {
            Ok(task) => {
                debug!("Task {} taken from tube {}", task.id, self.tube.name);
                Ok(Some(task))
            }
            Err(_) => Err(self.tube.not_found()),
        }
    }

    fn settle_timeout(&mut self) -> crate::Result<Option<Task>> {
        let mut state = self.tube.state.lock();
        self.settled = true;
        if state.remove_waiter(self.waiter_id) {
            debug!("Waiter {} timed out on tube {}", self.waiter_id, self.tube.name);
            return Ok(None);
        }
        // Granted (or closed) between the timer firing and the lock
        match self.rx.try_recv() {
            Ok(task) => Ok(Some(task)),
            Err(_) => Err(self.tube.not_found()),
        }
    }
}

impl Drop for PendingTake<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.tube.state.lock();
        if state.remove_waiter(self.waiter_id) {
            return;
        }
        if let Ok(task) = self.rx.try_recv() {
            warn!(
                "Take on tube {} cancelled after grant, returning task {}",
                self.tube.name, task.id
            );
            state.unlease(&task.id);
            state.dispatch();
        }
    }
}
