// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-core: domain types for the fleet job dispatcher

pub mod channel;
pub mod id;
pub mod job;
pub mod message;
pub mod payload;

pub use channel::{validate_tag, TagError, ALL_TAG};
pub use id::{IdGen, TokenIdGen};
pub use job::{Job, JobId, JobIdError, JobStatus, KILLED_OUTPUT};
pub use message::{ControlMessage, Dispatch, MessageError, ProgressMessage};
pub use payload::Payload;

#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
