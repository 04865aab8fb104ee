//! # Readiness Multiplexer Module
//!
//! Lets the pool owner discover which workers have produced an `Answer`
//! without blocking on any single worker's channel. Every worker's
//! pool-side answer receiver is registered under its worker index; the
//! worker set is index-stable for the pool lifetime, so an index uniquely
//! names a worker slot across respawns.
//!
//! Each readiness event drains exactly one message from one channel. A
//! channel that disconnects without an answer (worker died mid-task) is
//! reported once and then dropped from the set.

use std::time::Duration;

use flume::{Receiver, Selector, TryRecvError};
use tracing::trace;

use crate::channel::Answer;
use crate::error::WaitError;

/// What the multiplexer observed on one worker's answer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// The worker produced an answer.
    Answered(Answer),
    /// The channel closed without an answer; the worker is dead and must be
    /// respawned.
    Disconnected,
}

/// One readiness observation, keyed by worker index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEvent {
    pub worker: usize,
    pub outcome: ReadyOutcome,
}

/// Event-notification set over every worker's answer channel.
pub struct Multiplexer {
    slots: Vec<Option<Receiver<Answer>>>,
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("slots", &self.slots.len())
            .field("live", &self.live_count())
            .finish()
    }
}

impl Multiplexer {
    /// Creates a multiplexer with `size` empty slots.
    pub fn new(size: usize) -> Self {
        Self {
            slots: (0..size).map(|_| None).collect(),
        }
    }

    /// Registers (or re-registers, after a respawn) the worker at `index`.
    pub fn register(&mut self, index: usize, receiver: Receiver<Answer>) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(receiver);
    }

    /// Removes the worker at `index` from the set.
    pub fn deregister(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    /// Number of live registrations.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Blocks until at least one registered channel is readable and returns
    /// every event ready at that moment.
    pub fn wait(&mut self) -> Result<Vec<ReadyEvent>, WaitError> {
        if self.live_count() == 0 {
            return Err(WaitError::NoChannels);
        }
        let first = self.select().wait();
        Ok(self.collect_from(first))
    }

    /// Like `wait`, but gives up after `timeout`. An empty result means the
    /// timeout elapsed with no worker ready.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Vec<ReadyEvent>, WaitError> {
        if self.live_count() == 0 {
            return Err(WaitError::NoChannels);
        }
        match self.select().wait_timeout(timeout) {
            Ok(first) => Ok(self.collect_from(first)),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Non-blocking poll: drains at most one message from every registered
    /// channel and prunes the ones that disconnected.
    pub fn try_ready(&mut self) -> Vec<ReadyEvent> {
        let mut events = Vec::new();
        for index in 0..self.slots.len() {
            let outcome = match &self.slots[index] {
                Some(receiver) => match receiver.try_recv() {
                    Ok(answer) => ReadyOutcome::Answered(answer),
                    Err(TryRecvError::Empty) => continue,
                    Err(TryRecvError::Disconnected) => ReadyOutcome::Disconnected,
                },
                None => continue,
            };
            if outcome == ReadyOutcome::Disconnected {
                self.slots[index] = None;
            }
            events.push(ReadyEvent {
                worker: index,
                outcome,
            });
        }
        events
    }

    /// Builds a selector over every live slot. Callers must have checked
    /// that at least one slot is live.
    fn select(&self) -> Selector<'_, ReadyEvent> {
        let mut selector = Selector::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(receiver) = slot {
                selector = selector.recv(receiver, move |result| ReadyEvent {
                    worker: index,
                    outcome: match result {
                        Ok(answer) => ReadyOutcome::Answered(answer),
                        Err(_) => ReadyOutcome::Disconnected,
                    },
                });
            }
        }
        selector
    }

    /// Records the event the selector produced, then sweeps the remaining
    /// channels for anything else already readable.
    fn collect_from(&mut self, first: ReadyEvent) -> Vec<ReadyEvent> {
        trace!(worker = first.worker, outcome = ?first.outcome, "multiplexer woke");
        if first.outcome == ReadyOutcome::Disconnected {
            self.slots[first.worker] = None;
        }
        let mut events = vec![first];
        events.extend(self.try_ready());
        events
    }
}
