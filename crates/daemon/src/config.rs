// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration from flags and environment.

use crate::env;
use fleet_adapters::DEFAULT_BROKER_ADDR;
use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "Usage: fleetd [--bind ADDR] [--log-file PATH] [--help | --version]";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("{0} requires a value")]
    MissingValue(String),
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to listen on (host:port)
    pub bind: String,
    /// Log file; logs go to stderr when unset
    pub log_file: Option<PathBuf>,
}

/// What the command line asks for
#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    Run(Config),
    Help,
    Version,
}

impl Config {
    /// Parse flags, falling back to `FLEET_BIND` and `FLEET_LOG_FILE`.
    ///
    /// Flags win over the environment.
    pub fn from_args<I>(args: I) -> Result<Invocation, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut bind = None;
        let mut log_file = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" | "-h" | "help" => return Ok(Invocation::Help),
                "--version" | "-V" | "-v" => return Ok(Invocation::Version),
                "--bind" => {
                    bind = Some(args.next().ok_or(ConfigError::MissingValue(arg))?);
                }
                "--log-file" => {
                    log_file = Some(PathBuf::from(
                        args.next().ok_or(ConfigError::MissingValue(arg))?,
                    ));
                }
                _ => return Err(ConfigError::UnexpectedArgument(arg)),
            }
        }

        Ok(Invocation::Run(Config {
            bind: bind
                .or_else(env::bind_addr)
                .unwrap_or_else(|| DEFAULT_BROKER_ADDR.to_string()),
            log_file: log_file.or_else(env::log_file),
        }))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
