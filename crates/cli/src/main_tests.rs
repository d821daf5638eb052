// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use serial_test::serial;

use super::{broker_url, format_error, Cli, Commands};
use crate::exit_error::ExitError;

// -- Version and help ---------------------------------------------------------

#[test]
fn version_long() {
    let err = Cli::command()
        .try_get_matches_from(["fleet", "--version"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn help_lists_every_command() {
    let mut buf = Vec::new();
    Cli::command().write_help(&mut buf).unwrap();
    let help = String::from_utf8(buf).unwrap();
    for command in ["listen", "exec", "kill-all", "workers"] {
        assert!(help.contains(command), "help should list {command}");
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

// -- Subcommands ----------------------------------------------------------------

#[test]
fn broker_flag_is_global() {
    let cli = Cli::try_parse_from(["fleet", "workers", "--broker", "tcp://bus:1", "-t", "web"])
        .unwrap();
    assert_eq!(cli.broker.as_deref(), Some("tcp://bus:1"));
    match cli.command {
        Some(Commands::Workers(args)) => assert_eq!(args.tag, "web"),
        other => panic!("expected workers, got {other:?}"),
    }
}

#[test]
fn listen_takes_a_tag_list() {
    let cli = Cli::try_parse_from(["fleet", "listen", "-t", "web,db"]).unwrap();
    match cli.command {
        Some(Commands::Listen(args)) => assert_eq!(args.tags.as_deref(), Some("web,db")),
        other => panic!("expected listen, got {other:?}"),
    }
}

#[test]
fn kill_all_is_kebab_case() {
    let cli = Cli::try_parse_from(["fleet", "kill-all"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::KillAll)));
}

#[test]
fn exec_keeps_hyphenated_args_for_the_payload() {
    let cli = Cli::try_parse_from(["fleet", "exec", "-n", "2", "ls", "-la", "--color"]).unwrap();
    match cli.command {
        Some(Commands::Exec(args)) => {
            assert_eq!(args.num_workers, Some(2));
            assert_eq!(args.args, vec!["ls", "-la", "--color"]);
        }
        other => panic!("expected exec, got {other:?}"),
    }
}

// -- Broker URL -------------------------------------------------------------------

#[test]
#[serial(env)]
fn broker_url_prefers_the_flag() {
    std::env::set_var("FLEET_BROKER_URL", "tcp://env:2");
    let url = broker_url(Some("tcp://flag:1".to_string()));
    std::env::remove_var("FLEET_BROKER_URL");
    assert_eq!(url, "tcp://flag:1");
}

#[test]
#[serial(env)]
fn broker_url_falls_back_to_env_then_default() {
    std::env::set_var("FLEET_BROKER_URL", "tcp://env:2");
    assert_eq!(broker_url(None), "tcp://env:2");
    std::env::remove_var("FLEET_BROKER_URL");
    assert_eq!(broker_url(None), "tcp://127.0.0.1:7420");
}

// -- Error formatting ---------------------------------------------------------------

#[test]
fn exit_error_message_is_printed_verbatim() {
    let err = anyhow::Error::new(ExitError::new(2, "requested 3 workers but only 1 were available"));
    assert_eq!(
        format_error(&err),
        "requested 3 workers but only 1 were available"
    );
}

#[test]
fn silent_exit_error_prints_nothing() {
    let err = anyhow::Error::new(ExitError::silent(1));
    assert_eq!(format_error(&err), "");
}

#[test]
fn context_keeps_the_cause() {
    let err = anyhow::anyhow!("connection refused").context("cannot reach broker");
    assert_eq!(
        format_error(&err),
        "cannot reach broker\n\nCaused by:\n    0: connection refused"
    );
}
