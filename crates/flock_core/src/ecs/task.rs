//! Deferred task queue
//!
//! Systems run against a store they must not restructure while sibling
//! chunks are iterating it. Work that does restructure it (destroying an
//! entity, attaching components) is queued here and applied once, in FIFO
//! order, after every system of the frame has finished.

use crate::ecs::World;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One unit of deferred work.
pub type Task = Box<dyn FnOnce(&mut World) + Send>;

/// FIFO of deferred work. `enqueue` may be called concurrently from worker
/// chunks.
#[derive(Default)]
pub struct TaskQueue {
    queue: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, task: impl FnOnce(&mut World) + Send + 'static) {
        self.queue.lock().push_back(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Run every task queued at the time of the call, oldest first, and
    /// return how many ran. The lock is released before any task runs.
    pub fn run(&self, world: &mut World) -> usize {
        let batch = std::mem::take(&mut *self.queue.lock());
        let count = batch.len();
        for task in batch {
            task(world);
        }
        count
    }

    /// Drop queued tasks without running them.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }
}
