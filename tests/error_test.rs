// Integration tests for error types in perch::error.

use perch::error::*;

#[test]
fn construction_error_display() {
    assert_eq!(
        ConstructionError::ZeroSize.to_string(),
        "pool size must be at least 1"
    );
    let err = ConstructionError::ThreadSpawn {
        index: 3,
        source: std::io::Error::other("no threads left"),
    };
    assert_eq!(err.to_string(), "failed to spawn worker thread 3: no threads left");
}

#[test]
fn channel_error_display() {
    assert_eq!(
        ChannelError::Disconnected { worker: 2 }.to_string(),
        "control channel to worker 2 is disconnected"
    );
}

#[test]
fn submit_error_display() {
    assert_eq!(
        SubmitError::BacklogFull { capacity: 8 }.to_string(),
        "backlog is full (capacity: 8)"
    );
    assert_eq!(
        SubmitError::Disconnected { worker: 0 }.to_string(),
        "control channel to worker 0 is disconnected"
    );
    assert_eq!(
        SubmitError::NoWorkers.to_string(),
        "no live workers available to accept work"
    );
}

#[test]
fn submit_error_converts_from_channel_error() {
    assert_eq!(
        SubmitError::from(ChannelError::Disconnected { worker: 5 }),
        SubmitError::Disconnected { worker: 5 }
    );
}

#[test]
fn wait_error_display() {
    assert_eq!(
        WaitError::NoChannels.to_string(),
        "no live worker channels are registered with the multiplexer"
    );
}
