//! Errors raised before or while reaching the broker.

use crate::prelude::*;

#[test]
fn exec_without_anything_to_run() {
    cli()
        .args(&["exec", "--broker", "tcp://127.0.0.1:1"])
        .fails()
        .exit_code(1)
        .stderr_has("nothing to run");
}

#[test]
fn exec_with_unreachable_broker() {
    cli()
        .args(&["exec", "--broker", "tcp://127.0.0.1:1", "true"])
        .fails()
        .exit_code(1)
        .stderr_has("Error:");
}

#[test]
fn malformed_broker_url() {
    cli()
        .args(&["workers", "--broker", "redis://host/0"])
        .fails()
        .stderr_has("invalid broker url");
}

#[test]
fn multi_tag_exec_is_rejected() {
    let fleet = Fleet::start();
    fleet
        .fleet()
        .args(&["exec", "-t", "web,db", "true"])
        .fails()
        .exit_code(1)
        .stderr_has("invalid tag");
}

#[test]
fn empty_job_id_is_rejected() {
    let fleet = Fleet::start();
    fleet
        .fleet()
        .args(&["exec", "--id", "", "true"])
        .fails()
        .exit_code(1)
        .stderr_has("invalid job id");
}

#[test]
fn fleetd_rejects_unknown_flags() {
    let output = std::process::Command::new(fleetd_binary())
        .arg("--port")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected argument"));
}
