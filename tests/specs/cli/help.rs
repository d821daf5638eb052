//! Help and version output.

use crate::prelude::*;

#[test]
fn no_subcommand_prints_help() {
    cli()
        .passes()
        .stdout_has("Usage:")
        .stdout_has("listen")
        .stdout_has("exec")
        .stdout_has("kill-all")
        .stdout_has("workers");
}

#[test]
fn version_is_printed() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_eq(&format!("fleet {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn exec_help_documents_payload_options() {
    cli()
        .args(&["exec", "--help"])
        .passes()
        .stdout_has("--file")
        .stdout_has("--cmd")
        .stdout_has("--num-workers")
        .stdout_has("--tag");
}

#[test]
fn fleetd_help() {
    let assert = assert_cmd::Command::new(fleetd_binary())
        .arg("--help")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("--bind"), "stdout: {stdout}");
    assert!(stdout.contains("FLEET_LOG_FILE"), "stdout: {stdout}");
}
