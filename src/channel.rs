//! # Control Channel Module
//!
//! One duplex control channel per worker: `Query` messages travel from the
//! pool owner down to the worker, `Answer` messages travel back up. Each
//! direction is its own flume channel; the pair of endpoints is created
//! connected and is closed by dropping an endpoint.
//!
//! Delivery on one channel is point-to-point FIFO. The dispatch protocol
//! keeps at most one unanswered `Query` (plus at most one pending `Stop`)
//! per worker, so the channels never accumulate messages even though they
//! are unbounded.

use flume::{Receiver, Sender};

use crate::error::ChannelError;

/// Control message sent from the pool owner to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query<T> {
    /// Execute the carried task, then report back with `Answer::TaskResult`.
    Run(T),
    /// Exit the worker loop after answering `Answer::Stopped`.
    Stop,
}

/// Control message sent from a worker back to the pool owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// One task finished; the worker is idle again.
    TaskResult,
    /// The worker acknowledged a stop request and its loop has exited.
    Stopped,
}

/// Builds a connected endpoint pair for the worker at `worker`.
pub fn connect<T>(worker: usize) -> (PoolEndpoint<T>, WorkerEndpoint<T>) {
    let (query_tx, query_rx) = flume::unbounded();
    let (answer_tx, answer_rx) = flume::unbounded();
    (
        PoolEndpoint {
            worker,
            query_tx,
            answer_rx,
        },
        WorkerEndpoint {
            worker,
            query_rx,
            answer_tx,
        },
    )
}

/// Pool-owner side of a worker's control channel.
pub struct PoolEndpoint<T> {
    worker: usize,
    query_tx: Sender<Query<T>>,
    answer_rx: Receiver<Answer>,
}

impl<T> PoolEndpoint<T> {
    /// Index of the worker this endpoint is paired with.
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Sends one query to the worker.
    pub fn send_query(&self, query: Query<T>) -> Result<(), ChannelError> {
        self.query_tx.send(query).map_err(|_| ChannelError::Disconnected {
            worker: self.worker,
        })
    }

    /// Blocks until the worker produces its next answer.
    pub fn recv_answer(&self) -> Result<Answer, ChannelError> {
        self.answer_rx.recv().map_err(|_| ChannelError::Disconnected {
            worker: self.worker,
        })
    }

    /// A receiver handle for registering this worker with the readiness
    /// multiplexer. Shares the underlying channel with `recv_answer`.
    pub fn answer_receiver(&self) -> Receiver<Answer> {
        self.answer_rx.clone()
    }
}

/// Worker side of its control channel.
pub struct WorkerEndpoint<T> {
    worker: usize,
    query_rx: Receiver<Query<T>>,
    answer_tx: Sender<Answer>,
}

impl<T> WorkerEndpoint<T> {
    /// Index of the worker this endpoint belongs to.
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Blocks until the next query arrives from the pool owner.
    pub fn recv_query(&self) -> Result<Query<T>, ChannelError> {
        self.query_rx.recv().map_err(|_| ChannelError::Disconnected {
            worker: self.worker,
        })
    }

    /// Sends one answer back to the pool owner.
    pub fn send_answer(&self, answer: Answer) -> Result<(), ChannelError> {
        self.answer_tx.send(answer).map_err(|_| ChannelError::Disconnected {
            worker: self.worker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_round_trip_preserves_payload() {
        let (pool_end, worker_end) = connect::<u32>(3);

        pool_end.send_query(Query::Run(42)).unwrap();
        assert_eq!(worker_end.recv_query().unwrap(), Query::Run(42));

        pool_end.send_query(Query::Stop).unwrap();
        assert_eq!(worker_end.recv_query().unwrap(), Query::Stop);
    }

    #[test]
    fn answer_round_trip_preserves_variant() {
        let (pool_end, worker_end) = connect::<u32>(0);

        worker_end.send_answer(Answer::TaskResult).unwrap();
        assert_eq!(pool_end.recv_answer().unwrap(), Answer::TaskResult);

        worker_end.send_answer(Answer::Stopped).unwrap();
        assert_eq!(pool_end.recv_answer().unwrap(), Answer::Stopped);
    }

    #[test]
    fn disconnect_reports_the_worker_index() {
        let (pool_end, worker_end) = connect::<u32>(7);
        drop(worker_end);

        assert_eq!(
            pool_end.send_query(Query::Run(1)),
            Err(ChannelError::Disconnected { worker: 7 })
        );
        assert_eq!(
            pool_end.recv_answer(),
            Err(ChannelError::Disconnected { worker: 7 })
        );
    }
}
