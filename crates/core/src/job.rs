// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and state machine.

use crate::message::ProgressMessage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

crate::define_id! {
    /// Identifier of a dispatched job.
    ///
    /// Shared by the master and every slave executing the job; it appears
    /// in channel names, see [`JobId::validate`].
    pub struct JobId;
}

/// Errors from job id validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobIdError {
    #[error("job id must not be empty")]
    Empty,
    #[error("job id {0:?} may only contain letters, digits, '-', '_' and '.'")]
    Unsafe(String),
}

impl JobId {
    /// Check that the id can be embedded in channel names.
    pub fn validate(&self) -> Result<(), JobIdError> {
        if self.0.is_empty() {
            return Err(JobIdError::Empty);
        }
        let safe = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
        if !self.0.chars().all(safe) {
            return Err(JobIdError::Unsafe(self.0.clone()));
        }
        Ok(())
    }
}

/// Output recorded on a job killed by the master.
pub const KILLED_OUTPUT: &str = "Job killed";

/// Aggregate status of a job across all of its workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Dispatched, no worker has started yet
    Idle,
    /// At least one worker started
    Started,
    /// Every worker started
    Running,
    Success,
    Failed,
    Killed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed | JobStatus::Killed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Started => write!(f, "started"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Killed => write!(f, "killed"),
        }
    }
}

/// State of one dispatched job as seen by the master.
///
/// Counters never exceed `num_workers`, and once the job reaches a
/// terminal status no event changes it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub tag: String,
    /// Frozen at dispatch time
    pub num_workers: usize,
    pub status: JobStatus,
    pub num_started: usize,
    pub num_completed: usize,
    /// Only captured for failed or killed jobs
    pub output: Option<String>,
}

impl Job {
    pub fn new(id: JobId, tag: impl Into<String>, num_workers: usize) -> Self {
        let name = format!("Job {id}");
        Self {
            id,
            name,
            tag: tag.into(),
            num_workers,
            status: JobStatus::Idle,
            num_started: 0,
            num_completed: 0,
            output: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Feed one progress event into the state machine.
    ///
    /// Returns the new status when the event changed it.
    pub fn apply(&mut self, msg: &ProgressMessage) -> Option<JobStatus> {
        if self.is_terminal() {
            return None;
        }
        let before = self.status;

        match msg {
            ProgressMessage::Start => {
                if self.num_started < self.num_workers {
                    self.num_started += 1;
                }
                if self.status == JobStatus::Idle {
                    self.status = JobStatus::Started;
                }
                if self.status == JobStatus::Started && self.num_started == self.num_workers {
                    self.status = JobStatus::Running;
                }
            }
            ProgressMessage::Done { status, output } if *status != 0 => {
                self.output = Some(
                    output
                        .clone()
                        .unwrap_or_else(|| format!("exited with status {status}")),
                );
                self.status = JobStatus::Failed;
            }
            ProgressMessage::Done { .. } => {
                if self.num_completed < self.num_workers {
                    self.num_completed += 1;
                }
                if self.num_completed == self.num_workers {
                    self.status = JobStatus::Success;
                }
            }
        }

        (self.status != before).then_some(self.status)
    }

    /// Mark the job killed. Returns false if it was already terminal.
    pub fn kill(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Killed;
        self.output = Some(KILLED_OUTPUT.to_string());
        true
    }

    /// Fraction shown next to in-flight statuses.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match self.status {
            JobStatus::Started => Some((self.num_started, self.num_workers)),
            JobStatus::Running => Some((self.num_completed, self.num_workers)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
