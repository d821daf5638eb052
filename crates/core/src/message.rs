// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control and progress messages exchanged over the bus.
//!
//! Both families serialize as JSON objects tagged by `"type"`:
//!
//! ```text
//! {"type":"script","script":"#!/bin/bash\n...","id":"ABC","num_workers":2}
//! {"type":"exec","args":["make"],"id":"ABC","num_workers":2}
//! {"type":"kill","id":"ABC"}
//! {"type":"killall"}
//! {"type":"start"}
//! {"type":"done","status":1,"output":"..."}
//! ```

use crate::job::JobId;
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from message decoding
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// A dispatch order: run `payload` on up to `num_workers` slaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub id: JobId,
    pub num_workers: usize,
    pub payload: Payload,
    /// Tag the order was published under (informational)
    pub tag: Option<String>,
    /// When present, only slaves carrying one of these tags accept the order
    pub tags: Option<Vec<String>>,
}

impl Dispatch {
    /// Whether a slave with `own_tags` should accept this order.
    pub fn accepts(&self, own_tags: &[String]) -> bool {
        match &self.tags {
            Some(wanted) => wanted.iter().any(|t| own_tags.contains(t)),
            None => true,
        }
    }
}

/// Master → slave orders, published on control channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireControl", into = "WireControl")]
pub enum ControlMessage {
    Dispatch(Dispatch),
    Kill { id: JobId },
    KillAll,
}

impl ControlMessage {
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireControl {
    Script {
        script: String,
        id: JobId,
        num_workers: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tags: Option<Vec<String>>,
    },
    Exec {
        args: Vec<String>,
        id: JobId,
        num_workers: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tags: Option<Vec<String>>,
    },
    Kill {
        id: JobId,
    },
    Killall,
}

impl From<WireControl> for ControlMessage {
    fn from(wire: WireControl) -> Self {
        match wire {
            WireControl::Script {
                script,
                id,
                num_workers,
                tag,
                tags,
            } => ControlMessage::Dispatch(Dispatch {
                id,
                num_workers,
                payload: Payload::Script(script),
                tag,
                tags,
            }),
            WireControl::Exec {
                args,
                id,
                num_workers,
                tag,
                tags,
            } => ControlMessage::Dispatch(Dispatch {
                id,
                num_workers,
                payload: Payload::Exec(args),
                tag,
                tags,
            }),
            WireControl::Kill { id } => ControlMessage::Kill { id },
            WireControl::Killall => ControlMessage::KillAll,
        }
    }
}

impl From<ControlMessage> for WireControl {
    fn from(msg: ControlMessage) -> Self {
        match msg {
            ControlMessage::Dispatch(Dispatch {
                id,
                num_workers,
                payload,
                tag,
                tags,
            }) => match payload {
                Payload::Script(script) => WireControl::Script {
                    script,
                    id,
                    num_workers,
                    tag,
                    tags,
                },
                Payload::Exec(args) => WireControl::Exec {
                    args,
                    id,
                    num_workers,
                    tag,
                    tags,
                },
            },
            ControlMessage::Kill { id } => WireControl::Kill { id },
            ControlMessage::KillAll => WireControl::Killall,
        }
    }
}

/// Slave → master acknowledgements, published on a job's progress channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressMessage {
    /// Sent once per worker immediately before execution
    Start,
    /// Sent once per worker after the payload exited
    Done {
        status: i32,
        /// Captured output, only present for non-zero status
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
}

impl ProgressMessage {
    /// Build a `done` message, keeping `output` only for failures.
    pub fn done(status: i32, output: impl Into<String>) -> Self {
        ProgressMessage::Done {
            status,
            output: (status != 0).then(|| output.into()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
