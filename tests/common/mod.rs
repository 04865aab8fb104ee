use std::time::Duration;

use flume::{Receiver, Sender};

/// Generous bound for receives that should complete almost immediately.
pub const WAIT: Duration = Duration::from_secs(2);

/// Test-side handles for the gated executor.
pub struct Gate {
    /// One `(thread name, task)` entry per executor invocation.
    pub seen: Receiver<(String, u32)>,
    /// Each permit sent here lets one blocked invocation finish.
    pub release: Sender<()>,
}

/// Executor that records each task with the worker thread's name, then
/// waits for a release permit, so tests control exactly when a worker
/// answers.
pub fn gated_executor() -> (impl Fn(u32) + Send + Sync, Gate) {
    let (seen_tx, seen_rx) = flume::unbounded();
    let (release_tx, release_rx) = flume::unbounded();

    let executor = move |task: u32| {
        let name = std::thread::current()
            .name()
            .unwrap_or("unnamed")
            .to_string();
        let _ = seen_tx.send((name, task));
        let _ = release_rx.recv();
    };

    (
        executor,
        Gate {
            seen: seen_rx,
            release: release_tx,
        },
    )
}
