// A miniature request-serving pool.
//
// Feeds a batch of simulated requests through a small pool and drives the
// owner loop until everything has been served, then stops the workers
// gracefully. Run with `cargo run --example webserv`.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use perch::{logging, BacklogPolicy, Pool, PoolConfig};

#[derive(Debug)]
struct Request {
    id: u32,
    path: &'static str,
}

/// Stand-in for real request handling.
fn serve(request: Request) {
    thread::sleep(Duration::from_millis(10));
    tracing::info!(id = request.id, path = request.path, "request served");
}

fn main() -> Result<()> {
    logging::init_development();

    let config = PoolConfig {
        backlog_policy: BacklogPolicy::Block,
        ..PoolConfig::with_size(4)
    };
    let mut pool = Pool::with_config(config, serve)?;

    for id in 0..32 {
        pool.submit(Some(Request { id, path: "/index" }))?;
    }

    // Owner loop: wait for workers to report back, feed them from the
    // backlog until nothing is left in flight.
    loop {
        let status = pool.status();
        if status.busy == 0 && status.backlog == 0 {
            break;
        }
        pool.wait_ready()?;
        pool.submit(None)?;
    }

    pool.stop_all()?;
    Ok(())
}
