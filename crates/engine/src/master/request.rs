// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fleet_core::{JobId, Payload, ALL_TAG};

/// What to run and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub payload: Payload,
    /// Control channel tag the job is published on
    pub tag: String,
    /// Exact worker count; when unset, every available worker is used
    pub num_workers: Option<usize>,
    /// Caller-chosen id; random when unset
    pub id: Option<JobId>,
    /// Display name on the progress board
    pub name: Option<String>,
    /// Only workers carrying one of these tags accept the job
    pub only_tags: Option<Vec<String>>,
}

impl ExecRequest {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            tag: ALL_TAG.to_string(),
            num_workers: None,
            id: None,
            name: None,
            only_tags: None,
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = Some(num_workers);
        self
    }

    pub fn id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn only_tags(mut self, tags: Vec<String>) -> Self {
        self.only_tags = Some(tags);
        self
    }
}
