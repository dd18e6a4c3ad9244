//! Lease

use crate::task::TaskId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Bookkeeping for one leased task
#[derive(Debug, Clone, Copy)]
pub struct Lease {
    /// Ready sequence the task held when it was taken
    pub sequence: u64,
    /// When the task was handed out
    pub leased_at: Instant,
}

/// Tasks of one tube that are taken but not yet deleted or released
#[derive(Debug, Default)]
pub struct LeaseTracker {
    leases: HashMap<TaskId, Lease>,
}

impl LeaseTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lease for `id`
    pub fn lease(&mut self, id: TaskId, sequence: u64) {
        self.leases.insert(
            id,
            Lease {
                sequence,
                leased_at: Instant::now(),
            },
        );
    }

    /// Drop the lease for `id`, returning it if one existed
    pub fn end(&mut self, id: &TaskId) -> Option<Lease> {
        self.leases.remove(id)
    }

    /// Is `id` currently leased?
    pub fn contains(&self, id: &TaskId) -> bool {
        self.leases.contains_key(id)
    }

    /// Number of leased tasks
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    /// Check if nothing is leased
    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    /// Age of the longest held lease
    pub fn oldest(&self) -> Option<Duration> {
        self.leases
            .values()
            .map(|lease| lease.leased_at.elapsed())
            .max()
    }
}
