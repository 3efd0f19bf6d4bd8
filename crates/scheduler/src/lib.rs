use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("message queue has been shut down")]
    Closed,
}

/// Single-threaded queue of tasks keyed by the instant they become due.
///
/// Tasks with equal deadlines are delivered in the order they were posted.
/// A task value doubles as its identity: `remove` cancels every pending entry
/// that compares equal to the argument.
#[derive(Debug)]
pub struct MessageQueue<T> {
    pending: BTreeMap<(Instant, u64), T>,
    next_seq: u64,
    closed: bool,
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_seq: 0,
            closed: false,
        }
    }
}

impl<T: PartialEq + Clone> MessageQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, task: T, now: Instant) -> Result<(), SchedulerError> {
        self.post_at(task, now)
    }

    pub fn post_delayed(
        &mut self,
        task: T,
        now: Instant,
        delay: Duration,
    ) -> Result<(), SchedulerError> {
        self.post_at(task, now + delay)
    }

    pub fn post_at(&mut self, task: T, due: Instant) -> Result<(), SchedulerError> {
        if self.closed {
            return Err(SchedulerError::Closed);
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.insert((due, seq), task);
        Ok(())
    }

    /// Cancels all pending instances of `task`, returning how many were dropped.
    pub fn remove(&mut self, task: &T) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, queued| queued != task);
        let removed = before - self.pending.len();
        if removed > 0 {
            tracing::trace!(removed, "cancelled pending tasks");
        }
        removed
    }

    pub fn pending_count(&self, task: &T) -> usize {
        self.pending.values().filter(|queued| *queued == task).count()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Dequeues the oldest task due at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let key = *self.pending.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.pending.remove(&key)
    }

    /// Dequeues every task due at or before `now`, in delivery order.
    pub fn take_due(&mut self, now: Instant) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(task) = self.pop_due(now) {
            due.push(task);
        }
        due
    }

    /// Drops all pending work and rejects future posts.
    pub fn quit(&mut self) {
        if !self.closed {
            tracing::debug!(dropped = self.pending.len(), "message queue shutting down");
        }
        self.pending.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
