// Perch Worker Pool
//
// A fixed-size pool of worker threads driven over per-worker control
// channels instead of a shared work queue. The pool owner dispatches tasks
// to idle workers, queues overflow in a bounded stack-ordered backlog, and
// learns about completions through a readiness multiplexer over every
// worker's answer channel.

pub mod backlog;
pub mod channel;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mux;
pub mod pool;
pub mod worker;

// Re-export key types for easier usage
pub use backlog::Backlog;
pub use channel::{Answer, PoolEndpoint, Query, WorkerEndpoint};
pub use config::{BacklogPolicy, PoolConfig};
pub use error::{ChannelError, ConstructionError, SubmitError, WaitError};
pub use executor::TaskExecutor;
pub use mux::{Multiplexer, ReadyEvent, ReadyOutcome};
pub use pool::{Pool, PoolStatus};
pub use worker::{Worker, WorkerState};
