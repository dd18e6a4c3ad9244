//! Ready

use crate::task::TaskId;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Stale heap entries tolerated before the heap is rebuilt
const COMPACT_SLACK: usize = 64;

/// Heap entry for a ready task
#[derive(Debug, Clone)]
struct ReadyEntry {
    priority: i64,
    /// Sequence number for FIFO ordering within same priority
    sequence: u64,
    id: TaskId,
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for ReadyEntry {}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by priority (higher priority first)
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => {
                // If priorities are equal, use FIFO (lower sequence first)
                // Reverse because BinaryHeap is a max-heap
                other.sequence.cmp(&self.sequence)
            }
            other => other,
        }
    }
}

/// Ready tasks of one tube, ordered by `(priority desc, sequence asc)`
///
/// Removal of an arbitrary task is lazy: the id leaves `live` right away and
/// its heap entry is skipped once it surfaces. An entry is live only while
/// its sequence matches the one recorded in `live`, so a task that is
/// removed and pushed again never resurrects its old entry.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
    live: HashMap<TaskId, u64>,
    next_sequence: u64,
}

impl ReadyQueue {
    /// Create an empty ready queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task behind every ready task of the same priority
    ///
    /// Returns the sequence number assigned to the entry.
    pub fn push(&mut self, id: TaskId, priority: i64) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.insert(id, priority, sequence);
        sequence
    }

    /// Re-insert a task at a position it previously held
    ///
    /// `sequence` must come from an earlier [`push`](Self::push) of the same task.
    pub fn restore(&mut self, id: TaskId, priority: i64, sequence: u64) {
        self.insert(id, priority, sequence);
    }

    fn insert(&mut self, id: TaskId, priority: i64, sequence: u64) {
        self.live.insert(id.clone(), sequence);
        self.heap.push(ReadyEntry {
            priority,
            sequence,
            id,
        });
    }

    /// Remove and return the head task together with its sequence number
    pub fn pop(&mut self) -> Option<(TaskId, u64)> {
        self.prune_head();
        let entry = self.heap.pop()?;
        self.live.remove(&entry.id);
        Some((entry.id, entry.sequence))
    }

    /// Head task without removing it
    pub fn peek(&mut self) -> Option<&TaskId> {
        self.prune_head();
        self.heap.peek().map(|entry| &entry.id)
    }

    /// Remove a task wherever it sits in the ordering
    pub fn remove(&mut self, id: &TaskId) -> bool {
        if self.live.remove(id).is_none() {
            return false;
        }
        if self.heap.len() > self.live.len() * 2 + COMPACT_SLACK {
            let live = &self.live;
            self.heap
                .retain(|entry| live.get(&entry.id) == Some(&entry.sequence));
        }
        true
    }

    /// Is the task currently ready?
    pub fn contains(&self, id: &TaskId) -> bool {
        self.live.contains_key(id)
    }

    /// Number of ready tasks
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Check if no task is ready
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn prune_head(&mut self) {
        while let Some(entry) = self.heap.peek() {
            if self.live.get(&entry.id) == Some(&entry.sequence) {
                break;
            }
            self.heap.pop();
        }
    }
}
