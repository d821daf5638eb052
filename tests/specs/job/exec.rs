//! Dispatching jobs through fleetd to real workers.

use crate::prelude::*;

#[test]
fn successful_job_exits_zero() {
    let mut fleet = Fleet::start();
    fleet.worker(&[]);
    fleet.worker(&[]);

    fleet
        .fleet()
        .args(&["exec", "--name", "Hello", "-c", "echo", "hi"])
        .passes()
        .stderr_has("Hello")
        .stderr_has("done")
        .stderr_lacks("JOB FAILURE");
}

#[test]
fn failed_job_prints_remote_output() {
    let mut fleet = Fleet::start();
    fleet.worker(&[]);

    fleet
        .fleet()
        .args(&["exec", "-c", "echo boom; exit 3"])
        .fails()
        .exit_code(1)
        .stderr_has("JOB FAILURE:")
        .stderr_has(&"-".repeat(80))
        .stderr_has("boom");
}

#[test]
fn script_file_runs_on_workers() {
    let mut fleet = Fleet::start();
    fleet.worker(&[]);
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("check.sh");
    std::fs::write(&script, "echo \"slot $WORKER_INDEX/$NUM_WORKERS\"\nexit 5\n").unwrap();

    fleet
        .fleet()
        .args(&["exec", "-f", script.to_str().unwrap()])
        .fails()
        .exit_code(1)
        .stderr_has("slot 0/1");
}

#[test]
fn asking_for_more_workers_than_listen_is_a_quorum_error() {
    let mut fleet = Fleet::start();
    fleet.worker(&[]);

    fleet
        .fleet()
        .args(&["exec", "-n", "5", "true"])
        .fails()
        .exit_code(2)
        .stderr_has("only 1");
}

#[test]
fn tagged_workers_are_counted_per_tag() {
    let mut fleet = Fleet::start();
    fleet.worker(&["web"]);
    fleet.worker(&["web", "db"]);

    assert_eq!(fleet.workers_available("web"), 2);
    assert_eq!(fleet.workers_available("db"), 1);
    assert_eq!(fleet.workers_available("_all_"), 2);

    fleet.fleet().args(&["exec", "-t", "db", "true"]).passes();
}
