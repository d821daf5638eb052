// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use fleet_adapters::BrokerError;
use fleet_core::{JobId, JobIdError, MessageError, TagError};
use thiserror::Error;

/// Not enough subscribed workers to admit a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuorumError {
    #[error("requested {requested} workers but only {available} were available")]
    NotEnough { requested: usize, available: usize },
    #[error("no workers available on tag {tag}")]
    NoWorkers { tag: String },
}

/// Errors returned by master and slave operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Quorum(#[from] QuorumError),
    #[error("job {id} failed")]
    JobFailure { id: JobId, output: String },
    #[error("transport lost: {0}")]
    Transport(String),
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("invalid tag: {0}")]
    InvalidTag(#[from] TagError),
    #[error("invalid job id: {0}")]
    InvalidJobId(#[from] JobIdError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
