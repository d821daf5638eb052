// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job payloads: what a slave actually runs.

use serde::{Deserialize, Serialize};

/// Interpreter line prepended to scripts that lack one.
pub const DEFAULT_INTERPRETER: &str = "#!/bin/bash";

/// Environment variable carrying the worker's slot index (0-based).
pub const WORKER_INDEX_ENV: &str = "WORKER_INDEX";

/// Environment variable carrying the total worker count of the job.
pub const NUM_WORKERS_ENV: &str = "NUM_WORKERS";

/// Work dispatched to slaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Inline script, materialized to an executable file on the slave
    Script(String),
    /// Command line executed directly
    Exec(Vec<String>),
}

impl Payload {
    /// Build a script payload, adding [`DEFAULT_INTERPRETER`] when the
    /// script does not start with `#!`.
    pub fn script(script: impl Into<String>) -> Self {
        let script = script.into();
        if script.starts_with("#!") {
            Payload::Script(script)
        } else {
            Payload::Script(format!("{DEFAULT_INTERPRETER}\n{script}"))
        }
    }

    /// Build a script payload from command-line words (`exec --cmd`).
    pub fn inline_command<S: AsRef<str>>(args: &[S]) -> Self {
        let line = args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
        Self::script(line)
    }

    pub fn exec<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Payload::Exec(args.into_iter().map(Into::into).collect())
    }

    /// Short human description for logs.
    pub fn describe(&self) -> String {
        match self {
            Payload::Script(script) => {
                let body = script.lines().nth(1).unwrap_or_default();
                format!("script ({} lines): {}", script.lines().count(), body)
            }
            Payload::Exec(args) => format!("exec: {}", args.join(" ")),
        }
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
