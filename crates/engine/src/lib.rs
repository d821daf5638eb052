// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-engine: master and slave sides of job dispatch

pub mod env;
mod error;
pub mod master;
mod signal;
pub mod slave;

pub use error::{EngineError, QuorumError};
pub use master::{
    status_line, BoardStyle, ExecRequest, JobHandle, Master, MasterConfig, Multi, ProgressBoard,
};
pub use signal::Signal;
pub use slave::{Slave, SlaveConfig};
