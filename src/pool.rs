//! # Worker Pool Module
//!
//! The pool owns a fixed-size, index-stable set of workers plus the backlog
//! queue, and runs the dispatch algorithm that connects the two: scan
//! workers in index order, hand queued tasks to idle workers (most recent
//! first), and queue an arrival that found nobody idle.
//!
//! ## Single-writer constraint
//! The pool owner's thread is the only mutator of worker availability and
//! the backlog; worker threads communicate state changes exclusively through
//! their control channel. Every method therefore takes `&mut self`, and the
//! borrow checker enforces what a lock would otherwise have to.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::backlog::Backlog;
use crate::channel::{Answer, Query};
use crate::config::{BacklogPolicy, PoolConfig};
use crate::error::{ChannelError, ConstructionError, SubmitError, WaitError};
use crate::executor::{SharedExecutor, TaskExecutor};
use crate::logging;
use crate::mux::{Multiplexer, ReadyEvent, ReadyOutcome};
use crate::worker::{Worker, WorkerState};

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Total worker slots.
    pub size: usize,
    /// Workers idle and ready for a task.
    pub idle: usize,
    /// Workers executing a task or winding down one before stopping.
    pub busy: usize,
    /// Workers retired, killed, or dead awaiting respawn.
    pub stopped: usize,
    /// Tasks waiting in the backlog.
    pub backlog: usize,
}

/// Fixed-size worker-thread pool dispatching over per-worker control
/// channels.
///
/// Tasks are opaque to the pool: a task value is moved to a worker (or into
/// the backlog) on `submit` and consumed exactly once by the executor.
/// Workers report back over their own channel; the owner collects those
/// reports through [`Pool::wait_ready`] / [`Pool::poll_ready`] and feeds
/// freed workers from the backlog with `submit(None)`.
pub struct Pool<T> {
    workers: Vec<Worker<T>>,
    backlog: Backlog<T>,
    executor: SharedExecutor<T>,
    mux: Multiplexer,
    config: PoolConfig,
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("size", &self.workers.len())
            .field("backlog", &self.backlog)
            .field("mux", &self.mux)
            .finish()
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Builds a pool of `size` workers all running `executor`.
    pub fn new<E>(size: usize, executor: E) -> Result<Self, ConstructionError>
    where
        E: TaskExecutor<T> + 'static,
    {
        Self::with_config(PoolConfig::with_size(size), executor)
    }

    /// Builds a pool from an explicit configuration.
    ///
    /// Construction is all-or-nothing: if any worker thread fails to spawn,
    /// the ones already started are destroyed and no pool is returned.
    pub fn with_config<E>(config: PoolConfig, executor: E) -> Result<Self, ConstructionError>
    where
        E: TaskExecutor<T> + 'static,
    {
        if config.size == 0 {
            return Err(ConstructionError::ZeroSize);
        }
        let executor: SharedExecutor<T> = Arc::new(executor);
        // Worker threads log through whatever subscriber is current here.
        let dispatcher = logging::current_subscriber();

        let mut workers: Vec<Worker<T>> = Vec::with_capacity(config.size);
        let mut mux = Multiplexer::new(config.size);
        for index in 0..config.size {
            let spawned = Worker::spawn(
                index,
                config.thread_name(index),
                Arc::clone(&executor),
                dispatcher.clone(),
            );
            match spawned {
                Ok((worker, answers)) => {
                    mux.register(index, answers);
                    workers.push(worker);
                }
                Err(err) => {
                    for worker in &mut workers {
                        worker.destroy();
                    }
                    return Err(err);
                }
            }
        }

        info!(
            size = config.size,
            backlog_capacity = config.resolved_backlog_capacity(),
            policy = %config.backlog_policy,
            "worker pool started"
        );
        Ok(Self {
            backlog: Backlog::new(config.resolved_backlog_capacity()),
            workers,
            executor,
            mux,
            config,
        })
    }

    /// Submits a task, or with `None` just redistributes the backlog.
    ///
    /// Workers are scanned once in index order. Tasks already in the backlog
    /// are dispatched ahead of the new arrival, most recently queued first.
    /// An arrival that finds no idle worker is queued, subject to the
    /// configured capacity policy.
    pub fn submit(&mut self, task: Option<T>) -> Result<(), SubmitError> {
        let mut task = task;
        for index in 0..self.workers.len() {
            if self.backlog.is_empty() && task.is_none() {
                return Ok(());
            }
            if !self.workers[index].is_available() {
                continue;
            }
            // Entries already queued take priority over the new arrival.
            let next = match self.backlog.pop() {
                Some(queued) => queued,
                None => match task.take() {
                    Some(fresh) => fresh,
                    None => continue,
                },
            };
            self.dispatch(index, next)?;
        }
        match task {
            None => Ok(()),
            Some(task) => self.enqueue(task),
        }
    }

    /// Hands one task to the worker at `index`.
    fn dispatch(&mut self, index: usize, task: T) -> Result<(), SubmitError> {
        self.workers[index].set_available(false);
        match self.workers[index].send_query(Query::Run(task)) {
            Ok(()) => {
                trace!(worker = index, "task dispatched");
                Ok(())
            }
            Err(ChannelError::Disconnected { worker }) => {
                // The channel broke under us: the worker is dead until
                // respawned, and the task is gone with it.
                warn!(worker, "dispatch hit a dead worker, task lost");
                self.mux.deregister(worker);
                self.workers[index].destroy();
                Err(SubmitError::Disconnected { worker })
            }
        }
    }

    /// Places a task that found no idle worker into the backlog.
    fn enqueue(&mut self, task: T) -> Result<(), SubmitError> {
        match self.config.backlog_policy {
            BacklogPolicy::Reject => match self.backlog.push(task) {
                Ok(()) => {
                    trace!(backlog = self.backlog.len(), "task queued");
                    Ok(())
                }
                Err(_rejected) => {
                    debug!(
                        capacity = self.backlog.capacity(),
                        "backlog full, rejecting submission"
                    );
                    Err(SubmitError::BacklogFull {
                        capacity: self.backlog.capacity(),
                    })
                }
            },
            BacklogPolicy::Block => {
                let mut task = task;
                loop {
                    task = match self.backlog.push(task) {
                        Ok(()) => {
                            trace!(backlog = self.backlog.len(), "task queued");
                            return Ok(());
                        }
                        Err(returned) => returned,
                    };
                    // Block until a worker reports back, then drain the
                    // backlog onto it to make room.
                    if self.wait_ready().is_err() {
                        return Err(SubmitError::NoWorkers);
                    }
                    self.submit(None)?;
                }
            }
        }
    }

    /// Blocks until at least one worker reports back, applies every ready
    /// event, and returns the indices that reported.
    ///
    /// A returned index may be idle again (task finished), retired (stop
    /// acknowledged), or dead (channel closed without an answer; check
    /// [`Pool::worker_state`] and respawn). Call `submit(None)` afterwards
    /// to feed freed workers from the backlog.
    pub fn wait_ready(&mut self) -> Result<Vec<usize>, WaitError> {
        let events = self.mux.wait()?;
        Ok(self.apply(events))
    }

    /// Like [`Pool::wait_ready`], but gives up after `timeout`; an empty
    /// result means no worker reported in time.
    pub fn wait_ready_timeout(&mut self, timeout: Duration) -> Result<Vec<usize>, WaitError> {
        let events = self.mux.wait_timeout(timeout)?;
        Ok(self.apply(events))
    }

    /// Non-blocking readiness poll for embedding in a caller-driven loop.
    pub fn poll_ready(&mut self) -> Vec<usize> {
        let events = self.mux.try_ready();
        self.apply(events)
    }

    fn apply(&mut self, events: Vec<ReadyEvent>) -> Vec<usize> {
        let indices = events.iter().map(|event| event.worker).collect();
        for event in events {
            self.note_ready(event);
        }
        indices
    }

    /// Applies one readiness event to the worker table.
    fn note_ready(&mut self, event: ReadyEvent) {
        let index = event.worker;
        match event.outcome {
            ReadyOutcome::Answered(Answer::TaskResult) => {
                trace!(worker = index, "task finished");
                // A Stopping worker stays unavailable; its Stopped answer
                // is next on the channel.
                if self.workers[index].state() == WorkerState::Running {
                    self.workers[index].set_available(true);
                }
            }
            ReadyOutcome::Answered(Answer::Stopped) => {
                self.mux.deregister(index);
                self.workers[index].retire();
            }
            ReadyOutcome::Disconnected => {
                warn!(worker = index, "worker died without answering; respawn required");
                self.workers[index].destroy();
            }
        }
    }

    /// Replaces the worker at `index` with a fresh channel and thread.
    ///
    /// The old worker is forcibly destroyed; a task it was running is
    /// abandoned with an unknown outcome. All other indices are untouched.
    /// An out-of-range index is an explicit no-op.
    pub fn respawn(&mut self, index: usize) -> Result<(), ConstructionError> {
        if index >= self.workers.len() {
            debug!(index, "respawn index out of range, ignoring");
            return Ok(());
        }
        self.mux.deregister(index);
        self.workers[index].destroy();

        let dispatcher = logging::current_subscriber();
        let (worker, answers) = Worker::spawn(
            index,
            self.config.respawn_thread_name(index),
            Arc::clone(&self.executor),
            dispatcher,
        )?;
        self.mux.register(index, answers);
        self.workers[index] = worker;
        info!(worker = index, "worker respawned");
        Ok(())
    }

    /// Gracefully stops every running worker.
    ///
    /// Each worker receives a `Stop` query, finishes any in-flight task,
    /// answers `Stopped`, and is joined. Tasks still in the backlog are
    /// never dispatched and remain visible through [`Pool::status`].
    ///
    /// A worker whose channel is already broken cannot be stopped
    /// cooperatively; it is destroyed instead and the first such failure is
    /// returned after the rest of the pool has wound down.
    pub fn stop_all(&mut self) -> Result<(), ChannelError> {
        info!("stopping worker pool");
        let mut first_failure = None;
        for index in 0..self.workers.len() {
            if self.workers[index].state() != WorkerState::Running {
                continue;
            }
            if let Err(err) = self.workers[index].request_stop() {
                warn!(worker = index, "stop request hit a dead worker");
                self.mux.deregister(index);
                self.workers[index].destroy();
                first_failure.get_or_insert(err);
            }
        }

        // Drain answers until every stopping worker has acknowledged.
        // In-flight tasks produce a TaskResult first; the Stopped answer
        // follows on the same channel.
        while self.workers.iter().any(|w| w.state() == WorkerState::Stopping) {
            match self.mux.wait() {
                Ok(events) => {
                    for event in events {
                        self.note_ready(event);
                    }
                }
                Err(WaitError::NoChannels) => {
                    for worker in &mut self.workers {
                        if worker.state() == WorkerState::Stopping {
                            worker.destroy();
                        }
                    }
                    break;
                }
            }
        }
        info!(leftover = self.backlog.len(), "worker pool stopped");
        match first_failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

impl<T> Pool<T> {
    /// Number of worker slots in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// State of the worker at `index`, if the index is in range.
    pub fn worker_state(&self, index: usize) -> Option<WorkerState> {
        self.workers.get(index).map(|worker| worker.state())
    }

    /// Snapshot of pool occupancy.
    pub fn status(&self) -> PoolStatus {
        let mut idle = 0;
        let mut busy = 0;
        let mut stopped = 0;
        for worker in &self.workers {
            match worker.state() {
                WorkerState::Running if worker.is_available() => idle += 1,
                WorkerState::Running | WorkerState::Stopping => busy += 1,
                WorkerState::Stopped | WorkerState::Killed => stopped += 1,
            }
        }
        PoolStatus {
            size: self.workers.len(),
            idle,
            busy,
            stopped,
            backlog: self.backlog.len(),
        }
    }

    /// Forcibly terminates every worker.
    ///
    /// Threads blocked inside the executor are abandoned and their tasks
    /// have unknown outcomes. Safe to call repeatedly and after a partial
    /// or complete `stop_all`.
    pub fn destroy_all(&mut self) {
        debug!("destroying worker pool");
        for index in 0..self.workers.len() {
            self.mux.deregister(index);
            self.workers[index].destroy();
        }
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
