// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use yare::parameterized;

fn parse(args: &[&str]) -> Result<Invocation, ConfigError> {
    Config::from_args(args.iter().map(|s| s.to_string()))
}

fn clear_env() {
    std::env::remove_var("FLEET_BIND");
    std::env::remove_var("FLEET_LOG_FILE");
}

#[test]
#[serial(env)]
fn defaults_to_local_broker_address() {
    clear_env();
    assert_eq!(
        parse(&[]).unwrap(),
        Invocation::Run(Config {
            bind: DEFAULT_BROKER_ADDR.to_string(),
            log_file: None,
        })
    );
}

#[test]
#[serial(env)]
fn environment_fills_in_missing_flags() {
    clear_env();
    std::env::set_var("FLEET_BIND", "0.0.0.0:9000");
    std::env::set_var("FLEET_LOG_FILE", "/tmp/fleetd.log");

    let parsed = parse(&[]);
    clear_env();

    assert_eq!(
        parsed.unwrap(),
        Invocation::Run(Config {
            bind: "0.0.0.0:9000".to_string(),
            log_file: Some(PathBuf::from("/tmp/fleetd.log")),
        })
    );
}

#[test]
#[serial(env)]
fn flags_override_environment() {
    clear_env();
    std::env::set_var("FLEET_BIND", "0.0.0.0:9000");

    let parsed = parse(&["--bind", "127.0.0.1:1", "--log-file", "d.log"]);
    clear_env();

    assert_eq!(
        parsed.unwrap(),
        Invocation::Run(Config {
            bind: "127.0.0.1:1".to_string(),
            log_file: Some(PathBuf::from("d.log")),
        })
    );
}

#[parameterized(
    help = { &["--help"], Invocation::Help },
    short_help = { &["-h"], Invocation::Help },
    version = { &["--version"], Invocation::Version },
    help_wins = { &["--bind", "x:1", "help"], Invocation::Help },
)]
fn info_flags(args: &[&str], expected: Invocation) {
    assert_eq!(parse(args).unwrap(), expected);
}

#[parameterized(
    unknown = { &["--port", "1"], ConfigError::UnexpectedArgument("--port".to_string()) },
    bind_without_value = { &["--bind"], ConfigError::MissingValue("--bind".to_string()) },
    log_without_value = { &["--log-file"], ConfigError::MissingValue("--log-file".to_string()) },
)]
fn bad_arguments(args: &[&str], expected: ConfigError) {
    assert_eq!(parse(args).unwrap_err(), expected);
}
