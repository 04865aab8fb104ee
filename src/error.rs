use std::io;
use thiserror::Error;

/// Errors raised while constructing a pool or respawning a worker.
///
/// Construction is all-or-nothing: a partially built worker set is torn down
/// before the error is returned.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("pool size must be at least 1")]
    ZeroSize,
    #[error("failed to spawn worker thread {index}: {source}")]
    ThreadSpawn { index: usize, source: io::Error },
}

/// A broken control channel.
///
/// A disconnect on either direction means the worker on the other end is
/// gone. The worker is considered dead and must be respawned; any task it
/// was running is lost.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("control channel to worker {worker} is disconnected")]
    Disconnected { worker: usize },
}

/// Errors returned by `Pool::submit`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The backlog is at capacity under `BacklogPolicy::Reject`. The task
    /// was dropped; the caller retries or backpressures.
    #[error("backlog is full (capacity: {capacity})")]
    BacklogFull { capacity: usize },
    /// Dispatch hit a worker whose channel is broken. The task was dropped
    /// and the worker must be respawned.
    #[error("control channel to worker {worker} is disconnected")]
    Disconnected { worker: usize },
    /// Under `BacklogPolicy::Block` there is no live worker left to wait for.
    #[error("no live workers available to accept work")]
    NoWorkers,
}

impl From<ChannelError> for SubmitError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Disconnected { worker } => SubmitError::Disconnected { worker },
        }
    }
}

/// Errors returned while waiting on the readiness multiplexer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// Waiting with no live registrations would block forever.
    #[error("no live worker channels are registered with the multiplexer")]
    NoChannels,
}
