//! The two concurrent queues of the dispatcher.
//!
//! The ready queue hands out runnable tasks, best-effort ordered by priority
//! when so configured; ordering is a locality hint, not a correctness
//! requirement, and the plain FIFO flavor must produce the same
//! factorization. The wait queue holds tasks whose left-neighbor dependency
//! was unsatisfied at enqueue time until a worker re-checks them.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crossbeam::queue::SegQueue;
use parking_lot::Mutex;

use crate::types::TaskId;

/// Concurrent queue of runnable tasks.
pub enum ReadyQueue {
    /// Min-heap keyed by task priority.
    Priority(Mutex<BinaryHeap<Reverse<(u64, TaskId)>>>),
    /// Unordered first-in first-out.
    Fifo(SegQueue<TaskId>),
}

impl ReadyQueue {
    /// Create the flavor selected by the configuration.
    pub fn new(use_priority: bool) -> Self {
        if use_priority {
            ReadyQueue::Priority(Mutex::new(BinaryHeap::new()))
        } else {
            ReadyQueue::Fifo(SegQueue::new())
        }
    }

    /// Enqueue a runnable task.
    pub fn push(&self, priority: u64, id: TaskId) {
        match self {
            ReadyQueue::Priority(heap) => heap.lock().push(Reverse((priority, id))),
            ReadyQueue::Fifo(queue) => queue.push(id),
        }
    }

    /// Take the next runnable task, if any.
    pub fn try_pop(&self) -> Option<TaskId> {
        match self {
            ReadyQueue::Priority(heap) => heap.lock().pop().map(|Reverse((_, id))| id),
            ReadyQueue::Fifo(queue) => queue.pop(),
        }
    }

    /// Is the queue empty right now? Racy by nature; used for reporting.
    pub fn is_empty(&self) -> bool {
        match self {
            ReadyQueue::Priority(heap) => heap.lock().is_empty(),
            ReadyQueue::Fifo(queue) => queue.is_empty(),
        }
    }
}

/// Concurrent FIFO of not-yet-ready tasks.
pub struct WaitQueue(SegQueue<TaskId>);

impl WaitQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self(SegQueue::new())
    }

    /// Park a task whose left neighbor has not completed.
    pub fn push(&self, id: TaskId) {
        self.0.push(id);
    }

    /// Take one parked task for a re-check.
    pub fn try_pop(&self) -> Option<TaskId> {
        self.0.pop()
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
