use std::sync::Arc;

/// The work a pool actually performs, supplied by the caller.
///
/// Invoked synchronously on the worker thread, once per dispatched task.
/// The task value is moved into the call and consumed; the pool never
/// inspects it and never sees it again. Failure handling is the executor's
/// own concern: the pool does not catch panics, and a panicking executor
/// takes its worker down (observable to the owner as a channel disconnect).
pub trait TaskExecutor<T>: Send + Sync {
    /// Runs one task to completion on the calling worker thread.
    fn execute(&self, task: T);
}

impl<T, F> TaskExecutor<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn execute(&self, task: T) {
        self(task)
    }
}

/// Shared handle to the executor every worker in a pool runs.
pub type SharedExecutor<T> = Arc<dyn TaskExecutor<T>>;
