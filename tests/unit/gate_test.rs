//! Tests for the readiness gate

use std::thread;
use std::time::Duration;

use sleeping_ta::core::ReadyGate;

#[test]
fn test_guard_opens_gate_when_holder_panics() {
    let gate = ReadyGate::new();
    let result = thread::spawn({
        let gate = gate.clone();
        move || {
            let _open = gate.open_on_drop();
            panic!("spawner failed");
        }
    })
    .join();

    assert!(result.is_err());
    assert!(gate.wait_for(Duration::from_secs(1)));
}

#[test]
fn test_open_is_idempotent() {
    let gate = ReadyGate::new();
    gate.open();
    gate.open();
    assert!(gate.is_open());
    gate.wait();
}
