// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleetd library
//!
//! The broker server behind the `fleetd` binary, exposed so it can be
//! embedded and tested in-process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
mod env;
pub mod server;

pub use config::{Config, ConfigError, Invocation};
pub use server::Server;
