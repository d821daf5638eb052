// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-side handle on a dispatched job

use super::Shared;
use crate::error::EngineError;
use crate::signal::Signal;
use fleet_adapters::Broker;
use fleet_core::{Job, JobId, JobStatus};
use parking_lot::Mutex;
use std::sync::Arc;

/// Job state plus the signals it broadcasts on
pub(crate) struct JobCell {
    pub(crate) job: Mutex<Job>,
    signal: Signal,
    /// Signals of the groups this job belongs to
    groups: Mutex<Vec<Signal>>,
}

impl JobCell {
    pub(crate) fn new(job: Job) -> Self {
        Self {
            job: Mutex::new(job),
            signal: Signal::new(),
            groups: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn snapshot(&self) -> Job {
        self.job.lock().clone()
    }

    pub(crate) fn status(&self) -> JobStatus {
        self.job.lock().status
    }

    pub(crate) fn attach(&self, signal: Signal) {
        self.groups.lock().push(signal);
    }

    pub(crate) fn detach(&self, signal: &Signal) {
        self.groups.lock().retain(|s| !s.same_as(signal));
    }

    pub(crate) fn notify(&self) {
        self.signal.notify();
        for signal in self.groups.lock().iter() {
            signal.notify();
        }
    }
}

/// A dispatched job
pub struct JobHandle<B: Broker> {
    pub(crate) id: JobId,
    pub(crate) cell: Arc<JobCell>,
    pub(crate) shared: Arc<Shared<B>>,
}

impl<B: Broker> Clone for JobHandle<B> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            cell: Arc::clone(&self.cell),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: Broker> std::fmt::Debug for JobHandle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl<B: Broker> JobHandle<B> {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.cell.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Copy of the current job state.
    pub fn snapshot(&self) -> Job {
        self.cell.snapshot()
    }

    /// Wait for a terminal status.
    ///
    /// A failed job yields [`EngineError::JobFailure`] with the reported
    /// output. A killed job is not an error unless the kill came from losing
    /// the transport.
    pub async fn wait(&self) -> Result<Job, EngineError> {
        self.settled().await;
        self.outcome()
    }

    /// Wait for a terminal status without judging the outcome.
    pub(crate) async fn settled(&self) {
        self.cell
            .signal
            .wait_until(|| self.cell.status().is_terminal())
            .await;
        // A render may still be in flight on the listener
        self.shared.settle();
    }

    /// Result of a terminal job, as returned by [`JobHandle::wait`].
    pub(crate) fn outcome(&self) -> Result<Job, EngineError> {
        let job = self.snapshot();
        match job.status {
            JobStatus::Failed => Err(EngineError::JobFailure {
                id: job.id.clone(),
                output: job.output.clone().unwrap_or_default(),
            }),
            JobStatus::Killed => match self.shared.transport_error() {
                Some(reason) => Err(EngineError::Transport(reason)),
                None => Ok(job),
            },
            _ => Ok(job),
        }
    }

    /// Kill the job everywhere.
    ///
    /// Marks it killed locally and publishes a fleet-wide kill order. A job
    /// that is already terminal is left alone and nothing is published.
    /// Returns whether this call killed the job.
    pub async fn kill(&self) -> Result<bool, EngineError> {
        if !self.mark_killed() {
            return Ok(false);
        }
        self.announce_kill().await?;
        Ok(true)
    }

    /// Mark the job killed locally. Returns false if it was already terminal.
    pub(crate) fn mark_killed(&self) -> bool {
        let killed = self.shared.update(&self.cell, Job::kill);
        if killed {
            tracing::info!(job_id = %self.id, "killing job");
        }
        killed
    }

    /// Publish the fleet-wide kill order and stop tracking progress.
    pub(crate) async fn announce_kill(&self) -> Result<(), EngineError> {
        self.shared.publish_kill(&self.id).await?;
        self.shared.stop_tracking(&self.id).await;
        Ok(())
    }
}
