//! Fleet-wide kill orders.

use crate::prelude::*;

#[test]
fn kill_all_reports_receivers() {
    let mut fleet = Fleet::start();
    fleet.worker(&[]);
    fleet.worker(&["web"]);

    fleet
        .fleet()
        .args(&["kill-all"])
        .passes()
        .stdout_eq("killall sent to 2 workers\n");
}

#[test]
#[serial_test::serial]
fn kill_all_stops_running_jobs() {
    let mut fleet = Fleet::start();
    fleet.worker(&[]);

    let mut exec = fleet
        .fleet()
        .args(&["exec", "--id", "LONG", "sleep", "37.125"])
        .command()
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();
    // Give the worker time to pick the job up
    std::thread::sleep(std::time::Duration::from_millis(300));

    fleet.fleet().args(&["kill-all"]).passes();

    // The job never reports done, so the master keeps waiting; it is the
    // worker side that must have let go of the process
    let gone = wait_for(SPEC_WAIT_MAX_MS, || {
        !std::process::Command::new("pgrep")
            .args(["-f", "^sleep 37.125$"])
            .status()
            .is_ok_and(|s| s.success())
    });
    let _ = exec.kill();
    let _ = exec.wait();
    assert!(gone, "sleep should have been terminated");
}
