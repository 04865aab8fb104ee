// Integration tests for the dispatch algorithm and the backlog.

mod common;

use std::time::Duration;

use common::{gated_executor, WAIT};
use perch::{BacklogPolicy, ConstructionError, Pool, PoolConfig, SubmitError};

#[test]
fn construction_yields_all_idle_workers() {
    for size in [1, 2, 8] {
        let pool = Pool::new(size, |_: u32| {}).unwrap();
        let status = pool.status();
        assert_eq!(status.size, size);
        assert_eq!(status.idle, size);
        assert_eq!(status.busy, 0);
        assert_eq!(status.backlog, 0);
    }
}

#[test]
fn zero_size_pool_is_rejected() {
    let result = Pool::new(0, |_: u32| {});
    assert!(matches!(result, Err(ConstructionError::ZeroSize)));
}

#[test]
fn tasks_fan_out_to_distinct_workers() {
    let (executor, gate) = gated_executor();
    let mut pool = Pool::new(3, executor).unwrap();

    for task in 0..3u32 {
        pool.submit(Some(task)).unwrap();
    }

    let mut names = Vec::new();
    for _ in 0..3 {
        let (name, _) = gate.seen.recv_timeout(WAIT).unwrap();
        names.push(name);
    }
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3, "each task should land on its own worker");

    let status = pool.status();
    assert_eq!(status.idle, 0);
    assert_eq!(status.busy, 3);
    assert_eq!(status.backlog, 0);

    for _ in 0..3 {
        gate.release.send(()).unwrap();
    }
}

#[test]
fn overflow_lands_in_the_backlog() {
    let (executor, gate) = gated_executor();
    let mut pool = Pool::new(2, executor).unwrap();

    for task in 0..3u32 {
        pool.submit(Some(task)).unwrap();
    }

    let mut running = vec![
        gate.seen.recv_timeout(WAIT).unwrap().1,
        gate.seen.recv_timeout(WAIT).unwrap().1,
    ];
    running.sort_unstable();
    assert_eq!(running, vec![0, 1], "the first two arrivals dispatch immediately");
    assert_eq!(pool.status().backlog, 1);
    assert!(gate.seen.try_recv().is_err(), "the third arrival must wait");

    for _ in 0..3 {
        gate.release.send(()).unwrap();
    }
}

#[test]
fn most_recent_backlog_entry_dispatches_first() {
    let (executor, gate) = gated_executor();
    let config = PoolConfig {
        backlog_capacity: Some(8),
        ..PoolConfig::with_size(2)
    };
    let mut pool = Pool::with_config(config, executor).unwrap();

    // 1 and 2 dispatch immediately; 3, 4, 5 queue up.
    for task in [1u32, 2, 3, 4, 5] {
        pool.submit(Some(task)).unwrap();
    }
    let mut running = vec![
        gate.seen.recv_timeout(WAIT).unwrap().1,
        gate.seen.recv_timeout(WAIT).unwrap().1,
    ];
    running.sort_unstable();
    assert_eq!(running, vec![1, 2]);
    assert_eq!(pool.status().backlog, 3);

    // Free one worker: the most recently queued task runs next, not a
    // replay of the one that just finished.
    gate.release.send(()).unwrap();
    let ready = pool.wait_ready().unwrap();
    assert_eq!(ready.len(), 1);
    pool.submit(None).unwrap();
    assert_eq!(gate.seen.recv_timeout(WAIT).unwrap().1, 5);

    // And again, in reverse insertion order: 4 before 3.
    gate.release.send(()).unwrap();
    pool.wait_ready().unwrap();
    pool.submit(None).unwrap();
    assert_eq!(gate.seen.recv_timeout(WAIT).unwrap().1, 4);

    assert_eq!(pool.status().backlog, 1);
    for _ in 0..3 {
        gate.release.send(()).unwrap();
    }
}

#[test]
fn submit_none_with_empty_backlog_is_a_noop() {
    let (executor, gate) = gated_executor();
    let mut pool = Pool::new(2, executor).unwrap();

    pool.submit(None).unwrap();

    let status = pool.status();
    assert_eq!(status.idle, 2);
    assert_eq!(status.backlog, 0);
    assert!(gate.seen.try_recv().is_err());
}

#[test]
fn submissions_beyond_capacity_are_rejected() {
    let (executor, gate) = gated_executor();
    // Pool of 1 gets the default backlog bound of 2.
    let mut pool = Pool::new(1, executor).unwrap();

    pool.submit(Some(1)).unwrap();
    pool.submit(Some(2)).unwrap();
    pool.submit(Some(3)).unwrap();
    assert_eq!(
        pool.submit(Some(4)),
        Err(SubmitError::BacklogFull { capacity: 2 })
    );
    assert_eq!(pool.status().backlog, 2);

    for _ in 0..3 {
        gate.release.send(()).unwrap();
    }
}

#[test]
fn block_policy_waits_for_room_instead_of_rejecting() {
    let (executor, gate) = gated_executor();
    let config = PoolConfig {
        backlog_capacity: Some(1),
        backlog_policy: BacklogPolicy::Block,
        ..PoolConfig::with_size(1)
    };
    let mut pool = Pool::with_config(config, executor).unwrap();

    // Permits up front so workers never stall while submit blocks for room.
    for _ in 0..8 {
        gate.release.send(()).unwrap();
    }
    for task in 0..8u32 {
        pool.submit(Some(task)).unwrap();
    }

    // Drain whatever is still in flight or queued.
    loop {
        let status = pool.status();
        if status.busy == 0 && status.backlog == 0 {
            break;
        }
        pool.wait_ready().unwrap();
        pool.submit(None).unwrap();
    }

    let mut served: Vec<u32> = gate.seen.drain().map(|(_, task)| task).collect();
    served.sort_unstable();
    assert_eq!(served, (0..8u32).collect::<Vec<_>>());
}

#[test]
fn readiness_polls_are_nonblocking_when_nothing_is_ready() {
    let (executor, _gate) = gated_executor();
    let mut pool = Pool::new(1, executor).unwrap();

    assert!(pool.poll_ready().is_empty());
    let ready = pool.wait_ready_timeout(Duration::from_millis(20)).unwrap();
    assert!(ready.is_empty());
}
