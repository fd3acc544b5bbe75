use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::core::Target;

/// Shared work queue handed to every engine worker.
///
/// Each target keeps the position it had in the input list so results can
/// be written back to the matching slot. Duplicates are kept: every input
/// line is probed.
pub struct TargetManager {
    queue: Mutex<VecDeque<(usize, Target)>>,
    total: usize,
}

impl TargetManager {
    /// Creates a queue holding `targets` in input order.
    pub fn new(targets: Vec<Target>) -> Self {
        let total = targets.len();
        Self {
            queue: Mutex::new(targets.into_iter().enumerate().collect()),
            total,
        }
    }

    /// Claims the next pending target, or `None` once the queue is drained.
    pub async fn next(&self) -> Option<(usize, Target)> {
        self.queue.lock().await.pop_front()
    }

    /// Number of targets the queue was created with.
    pub fn total(&self) -> usize {
        self.total
    }
}
