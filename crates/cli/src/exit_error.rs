// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors carrying a specific process exit code

use thiserror::Error;

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_QUORUM: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Exit with `code`, printing `message` unless it is empty
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Exit with `code` without printing anything more.
    pub fn silent(code: i32) -> Self {
        Self::new(code, "")
    }
}
