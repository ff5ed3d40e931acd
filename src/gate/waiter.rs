//! Queued requests waiting for a slot.

use std::collections::VecDeque;
use std::time::Instant;

use tokio::sync::oneshot;

/// A request parked in a wait queue until a release promotes it or its
/// timeout fires. Resolves exactly once, through exactly one of those
/// two paths.
#[derive(Debug)]
pub(crate) struct Waiter {
    pub id: u64,
    /// Fired by the promoting release; the waiting `acquire` holds the
    /// receiving end.
    pub grant_tx: oneshot::Sender<()>,
    pub enqueued_at: Instant,
    pub is_priority: bool,
    pub is_heavy: bool,
    pub path: String,
}

/// The two FIFO wait queues, serviced in fixed precedence order.
#[derive(Debug, Default)]
pub(crate) struct WaitQueues {
    priority: VecDeque<Waiter>,
    normal: VecDeque<Waiter>,
}

impl WaitQueues {
    pub fn len(&self) -> usize {
        self.priority.len() + self.normal.len()
    }

    pub fn priority_len(&self) -> usize {
        self.priority.len()
    }

    pub fn normal_len(&self) -> usize {
        self.normal.len()
    }

    pub fn push(&mut self, waiter: Waiter) {
        if waiter.is_priority {
            self.priority.push_back(waiter);
        } else {
            self.normal.push_back(waiter);
        }
    }

    /// Next waiter in precedence order: the priority queue drains fully
    /// before the normal queue is touched.
    pub fn pop_next(&mut self) -> Option<Waiter> {
        self.priority.pop_front().or_else(|| self.normal.pop_front())
    }

    /// Remove a waiter by id from the queue it was parked in. Returns
    /// `None` if a promotion already took it.
    pub fn remove(&mut self, id: u64, is_priority: bool) -> Option<Waiter> {
        let queue = if is_priority {
            &mut self.priority
        } else {
            &mut self.normal
        };
        let index = queue.iter().position(|w| w.id == id)?;
        queue.remove(index)
    }
}
