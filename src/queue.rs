//! Queue of pending acquisitions
//!
//! All mutation happens under the owning semaphore's lock, so the queue
//! itself is a plain ordered container with no internal synchronization.

use crate::error::Result;
use futures::channel::oneshot;
use std::collections::VecDeque;

/// A suspended acquisition: the requested permit count plus the one-shot
/// completion handle its caller is awaiting
#[derive(Debug)]
pub(crate) struct Waiter {
    /// Permits this request needs before it can be granted
    pub(crate) permits: usize,
    tx: oneshot::Sender<Result<bool>>,
}

impl Waiter {
    pub(crate) fn new(permits: usize) -> (Self, oneshot::Receiver<Result<bool>>) {
        let (tx, rx) = oneshot::channel();
        (Self { permits, tx }, rx)
    }

    /// Complete the request; consumes the waiter so it can fire only once.
    /// A receiver that was dropped mid-wait simply has nobody left to
    /// observe the outcome.
    pub(crate) fn complete(self, outcome: Result<bool>) {
        let _ = self.tx.send(outcome);
    }
}

/// Ordered collection of pending requests
///
/// Insertion order is the grant order in fair mode, so positions matter.
#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    entries: VecDeque<Waiter>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Insert at `position` when it falls within current bounds; any other
    /// position (or `None`) appends to the tail.
    pub(crate) fn insert(&mut self, waiter: Waiter, position: Option<usize>) {
        match position {
            Some(index) if index < self.entries.len() => self.entries.insert(index, waiter),
            _ => self.entries.push_back(waiter),
        }
    }

    /// Put an unsatisfied waiter back at the head of the line
    pub(crate) fn push_front(&mut self, waiter: Waiter) {
        self.entries.push_front(waiter);
    }

    pub(crate) fn pop_front(&mut self) -> Option<Waiter> {
        self.entries.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove every pending request, handing them back for rejection
    pub(crate) fn drain_all(&mut self) -> Vec<Waiter> {
        self.entries.drain(..).collect()
    }
}
