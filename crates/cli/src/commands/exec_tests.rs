// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{Cli, Commands};
use clap::Parser;
use serial_test::serial;
use std::io::Write;

fn parse(args: &[&str]) -> ExecArgs {
    let argv: Vec<&str> = ["fleet", "exec"].iter().chain(args).copied().collect();
    match Cli::try_parse_from(argv).unwrap().command {
        Some(Commands::Exec(args)) => args,
        other => panic!("expected exec, got {other:?}"),
    }
}

#[test]
fn plain_args_are_exec_payload() {
    let args = parse(&["ls", "-la", "/tmp"]);
    assert_eq!(
        args.payload().unwrap(),
        Payload::Exec(vec!["ls".into(), "-la".into(), "/tmp".into()])
    );
}

#[test]
fn cmd_joins_args_into_a_script() {
    let args = parse(&["-c", "echo", "$HOSTNAME", "|", "wc"]);
    assert_eq!(
        args.payload().unwrap(),
        Payload::Script("#!/bin/bash\necho $HOSTNAME | wc".to_string())
    );
}

#[test]
fn file_is_read_as_script() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "#!/bin/sh\necho from file\n").unwrap();
    let path = file.path().to_str().unwrap();

    let args = parse(&["-f", path]);

    assert_eq!(
        args.payload().unwrap(),
        Payload::Script("#!/bin/sh\necho from file\n".to_string())
    );
}

#[test]
fn missing_file_names_the_path() {
    let args = parse(&["--file", "/nonexistent/deploy.sh"]);
    let err = args.payload().unwrap_err().to_string();
    assert!(err.contains("/nonexistent/deploy.sh"), "got: {err}");
}

#[test]
fn file_with_args_is_rejected() {
    let args = parse(&["-f", "deploy.sh", "extra"]);
    assert!(args.payload().is_err());
}

#[test]
fn nothing_to_run_is_rejected() {
    let args = parse(&["-t", "web"]);
    let err = args.payload().unwrap_err().to_string();
    assert!(err.contains("nothing to run"), "got: {err}");
}

#[test]
fn file_conflicts_with_cmd() {
    let result = Cli::try_parse_from(["fleet", "exec", "-f", "x.sh", "-c", "ls"]);
    assert!(result.is_err());
}

#[test]
fn request_carries_every_option() {
    let args = parse(&[
        "-n", "3", "--id", "deploy-1", "-t", "web", "--name", "Deploy", "uptime",
    ]);
    let request = args.request().unwrap();

    assert_eq!(request.tag, "web");
    assert_eq!(request.num_workers, Some(3));
    assert_eq!(request.id.as_ref().map(|id| id.as_str()), Some("deploy-1"));
    assert_eq!(request.name.as_deref(), Some("Deploy"));
}

#[test]
fn request_defaults_to_every_worker() {
    let request = parse(&["uptime"]).request().unwrap();

    assert_eq!(request.tag, ALL_TAG);
    assert_eq!(request.num_workers, None);
    assert_eq!(request.id, None);
}

#[test]
#[serial(env)]
fn failure_report_has_banner_rule_and_output() {
    std::env::set_var("NO_COLOR", "1");
    let report = failure_report("disk full");
    std::env::remove_var("NO_COLOR");

    assert_eq!(report, format!("JOB FAILURE:\n{}\ndisk full\n", "-".repeat(80)));
}
