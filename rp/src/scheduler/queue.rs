//! Task queue and scheduler status types

use std::collections::VecDeque;

use crate::domain::Task;

/// FIFO of pending tasks.
///
/// Has no locking of its own; the scheduler owns it and serializes access.
#[derive(Debug, Default)]
pub struct TaskQueue {
    fifo: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail
    pub fn enqueue(&mut self, task: Task) {
        self.fifo.push_back(task);
    }

    /// Remove and return the head, or `None` when empty
    pub fn dequeue(&mut self) -> Option<Task> {
        self.fifo.pop_front()
    }

    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }
}

/// Counters kept by the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub total_submitted: u64,
    pub total_dispatched: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub peak_in_flight: usize,
    pub peak_queue_depth: usize,
}

impl SchedulerStats {
    pub fn total_completed(&self) -> u64 {
        self.total_succeeded + self.total_failed
    }
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone)]
pub struct QueueState {
    pub in_flight: usize,
    pub queued: usize,
    pub max_concurrency: usize,
    /// Whether the admission loop is currently alive
    pub running: bool,
    pub stats: SchedulerStats,
}

impl QueueState {
    /// Nothing queued and nothing in flight
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.queued == 0
    }
}
