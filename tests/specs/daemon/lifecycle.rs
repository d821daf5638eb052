//! fleetd startup and shutdown.

use crate::prelude::*;
use std::process::{Command, Stdio};

#[test]
fn fleetd_announces_its_address() {
    let fleet = Fleet::start();
    assert!(fleet.url().starts_with("tcp://127.0.0.1:"));
    assert_eq!(fleet.workers_available("_all_"), 0);
}

#[test]
fn fleetd_stops_on_sigterm() {
    let mut daemon = Command::new(fleetd_binary())
        .args(["--bind", "127.0.0.1:0"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let mut line = String::new();
    std::io::BufRead::read_line(
        &mut std::io::BufReader::new(daemon.stdout.take().unwrap()),
        &mut line,
    )
    .unwrap();
    assert!(line.starts_with("READY "));

    Command::new("kill")
        .args(["-TERM", &daemon.id().to_string()])
        .status()
        .unwrap();

    let exited = wait_for(SPEC_WAIT_MAX_MS, || {
        matches!(daemon.try_wait(), Ok(Some(status)) if status.success())
    });
    assert!(exited, "fleetd should exit cleanly on SIGTERM");
}

#[test]
fn fleetd_logs_to_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs").join("fleetd.log");
    let mut daemon = Command::new(fleetd_binary())
        .args(["--bind", "127.0.0.1:0", "--log-file"])
        .arg(&log)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let mut line = String::new();
    std::io::BufRead::read_line(
        &mut std::io::BufReader::new(daemon.stdout.take().unwrap()),
        &mut line,
    )
    .unwrap();

    let logged = wait_for(SPEC_WAIT_MAX_MS, || {
        std::fs::read_to_string(&log).is_ok_and(|text| text.contains("broker listening"))
    });
    let _ = daemon.kill();
    let _ = daemon.wait();
    assert!(logged, "log file should record startup");
}
