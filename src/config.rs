use std::fmt;

/// Default prefix for worker thread names; the worker index is appended.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "pool-";

// --- Configuration Enums ---

/// Defines the behavior when `Pool::submit` finds the backlog at capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BacklogPolicy {
    /// The submission immediately returns `SubmitError::BacklogFull`.
    /// The rejected task is dropped; callers that cannot regenerate a task
    /// should use `Block` instead.
    Reject,
    /// The submission blocks until a worker reports back, redistributes the
    /// backlog, and retries until the task has been placed.
    Block,
}

// --- Pool Configuration ---

/// Configuration for a worker pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// The number of worker threads. The pool is fixed-size: workers are
    /// created together at construction and only ever replaced in place.
    pub size: usize,

    /// The capacity of the backlog queue. `None` resolves to `2 * size`.
    pub backlog_capacity: Option<usize>,

    /// What `submit` does when the backlog is at capacity.
    pub backlog_policy: BacklogPolicy,

    /// Prefix for worker thread names; the worker index is appended, and
    /// respawned workers get a `respawn-` infix.
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: num_cpus::get(),
            backlog_capacity: None,
            backlog_policy: BacklogPolicy::Reject,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl PoolConfig {
    /// A configuration with the given pool size and defaults for the rest.
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Resolves the effective backlog bound for this configuration.
    pub fn resolved_backlog_capacity(&self) -> usize {
        self.backlog_capacity.unwrap_or(self.size * 2)
    }

    /// The thread name for the worker at `index`.
    pub(crate) fn thread_name(&self, index: usize) -> String {
        format!("{}{}", self.thread_name_prefix, index)
    }

    /// The thread name for a respawned worker at `index`.
    pub(crate) fn respawn_thread_name(&self, index: usize) -> String {
        format!("{}respawn-{}", self.thread_name_prefix, index)
    }
}

impl fmt::Display for BacklogPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BacklogPolicy::Reject => write!(f, "reject"),
            BacklogPolicy::Block => write!(f, "block"),
        }
    }
}
