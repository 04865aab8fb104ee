//! # Worker Module
//!
//! One pool worker is one OS thread bound to one control channel, running a
//! receive-dispatch-reply loop: block on the next `Query`, run the task
//! through the executor, answer, repeat. The loop has exactly two suspension
//! points: the blocking receive and the executor call itself.
//!
//! Graceful stop is cooperative (`Query::Stop`, acknowledged with
//! `Answer::Stopped`). Forced termination sets a cancellation flag and drops
//! the pool-side endpoints; a worker blocked on its receive exits promptly,
//! while one stuck inside the executor is abandoned and its task outcome is
//! unknown.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use flume::Receiver;
use tracing::{debug, trace, warn};

use crate::channel::{self, Answer, PoolEndpoint, Query, WorkerEndpoint};
use crate::error::{ChannelError, ConstructionError};
use crate::executor::SharedExecutor;

/// States a worker can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// The worker loop is live, either idle or executing a task.
    Running,
    /// A stop request is in flight; the worker finishes any in-flight task
    /// and then acknowledges with `Answer::Stopped`.
    Stopping,
    /// The worker acknowledged a stop and its thread was joined.
    Stopped,
    /// The worker was forcibly terminated or died without an answer.
    Killed,
}

/// Cooperative cancellation flag shared with the worker thread.
///
/// Checked at the top of the worker loop. Together with dropping the
/// pool-side endpoints this replaces asynchronous signal delivery as the
/// forced-termination primitive.
#[derive(Clone, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One pool worker: an OS thread paired with the pool-side channel endpoint.
///
/// Owned exclusively by the pool; `available` is mutated only by the pool
/// owner. A worker is available if and only if it holds no outstanding
/// query it has not yet answered.
pub struct Worker<T> {
    id: usize,
    endpoint: Option<PoolEndpoint<T>>,
    thread: Option<JoinHandle<()>>,
    cancel: CancelToken,
    state: WorkerState,
    available: bool,
}

impl<T> fmt::Debug for Worker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("available", &self.available)
            .finish()
    }
}

impl<T: Send + 'static> Worker<T> {
    /// Builds the control channel and starts the worker thread.
    ///
    /// Returns the worker plus the answer receiver to register with the
    /// readiness multiplexer. The thread installs `dispatcher` so worker
    /// logs flow into the subscriber that was current at pool construction.
    pub(crate) fn spawn(
        id: usize,
        name: String,
        executor: SharedExecutor<T>,
        dispatcher: tracing::Dispatch,
    ) -> Result<(Self, Receiver<Answer>), ConstructionError> {
        let (pool_end, worker_end) = channel::connect(id);
        let answers = pool_end.answer_receiver();
        let cancel = CancelToken::default();
        let cancel_flag = cancel.clone();

        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let _guard = tracing::dispatcher::set_default(&dispatcher);
                run(worker_end, executor, cancel_flag);
            })
            .map_err(|source| ConstructionError::ThreadSpawn { index: id, source })?;

        let worker = Self {
            id,
            endpoint: Some(pool_end),
            thread: Some(thread),
            cancel,
            state: WorkerState::Running,
            available: true,
        };
        Ok((worker, answers))
    }
}

impl<T> Worker<T> {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub(crate) fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Sends one query to the worker thread.
    pub(crate) fn send_query(&self, query: Query<T>) -> Result<(), ChannelError> {
        match &self.endpoint {
            Some(endpoint) => endpoint.send_query(query),
            None => Err(ChannelError::Disconnected { worker: self.id }),
        }
    }

    /// Asks the worker to stop once any in-flight task completes.
    pub(crate) fn request_stop(&mut self) -> Result<(), ChannelError> {
        self.send_query(Query::Stop)?;
        self.available = false;
        self.state = WorkerState::Stopping;
        trace!(worker = self.id, "stop requested");
        Ok(())
    }

    /// Finalizes a worker that has answered `Stopped`: joins the thread and
    /// releases the channel.
    pub(crate) fn retire(&mut self) {
        self.endpoint = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(worker = self.id, "worker thread panicked while stopping");
            }
        }
        self.state = WorkerState::Stopped;
        self.available = false;
        debug!(worker = self.id, "worker retired");
    }

    /// Forcibly terminates the worker.
    ///
    /// Sets the cancel flag and drops the pool-side endpoints, which
    /// unblocks a worker waiting on its receive. A thread still inside the
    /// executor is abandoned; its task outcome is unknown. Safe to call on
    /// a worker that already stopped.
    pub(crate) fn destroy(&mut self) {
        self.cancel.cancel();
        let was_idle = self.available;
        self.endpoint = None;
        self.available = false;
        if let Some(thread) = self.thread.take() {
            // An idle worker is parked on its receive and exits as soon as
            // the channel drops; a busy one may be stuck in the executor.
            if was_idle || thread.is_finished() {
                let _ = thread.join();
            } else {
                warn!(worker = self.id, "abandoning worker thread during forced destroy");
            }
        }
        if self.state != WorkerState::Stopped {
            self.state = WorkerState::Killed;
        }
    }
}

/// Receive-dispatch-reply loop run by every worker thread.
fn run<T>(endpoint: WorkerEndpoint<T>, executor: SharedExecutor<T>, cancel: CancelToken) {
    let id = endpoint.worker();
    trace!(worker = id, "worker loop started");
    loop {
        if cancel.is_cancelled() {
            debug!(worker = id, "worker cancelled, exiting without answer");
            return;
        }
        let query = match endpoint.recv_query() {
            Ok(query) => query,
            // Pool side dropped the channel: forced teardown.
            Err(_) => {
                debug!(worker = id, "control channel closed, exiting");
                return;
            }
        };
        match query {
            Query::Run(task) => {
                trace!(worker = id, "task received");
                executor.execute(task);
                if endpoint.send_answer(Answer::TaskResult).is_err() {
                    return;
                }
            }
            Query::Stop => {
                let _ = endpoint.send_answer(Answer::Stopped);
                debug!(worker = id, "worker stopped");
                return;
            }
        }
    }
}
