// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fail-fast job groups

use super::{ExecRequest, JobHandle, Master};
use crate::error::EngineError;
use crate::signal::Signal;
use fleet_adapters::Broker;
use fleet_core::{IdGen, JobStatus};

/// Jobs dispatched together and waited on together.
///
/// Every member also broadcasts on the group's signal. The first member to
/// fail aborts the rest. Dropping the group detaches its signal from the
/// members and kills the ones still unfinished, so leaving the scope early
/// (for example through `?` on a failed dispatch) never strands work on the
/// fleet.
pub struct Multi<'m, B: Broker, G: IdGen> {
    master: &'m Master<B, G>,
    jobs: Vec<JobHandle<B>>,
    signal: Signal,
}

impl<'m, B: Broker, G: IdGen> Multi<'m, B, G> {
    pub(crate) fn new(master: &'m Master<B, G>) -> Self {
        Self {
            master,
            jobs: Vec::new(),
            signal: Signal::new(),
        }
    }

    /// Dispatch a job into the group. Waiting is deferred to [`Multi::wait`].
    pub async fn exec(&mut self, request: ExecRequest) -> Result<JobHandle<B>, EngineError> {
        let job = self.master.async_exec(request).await?;
        self.add(job.clone())?;
        Ok(job)
    }

    /// Adopt a job dispatched elsewhere.
    pub fn add(&mut self, job: JobHandle<B>) -> Result<(), EngineError> {
        if self.jobs.iter().any(|member| member.id == job.id) {
            return Err(EngineError::InvalidRequest(format!(
                "job {} is already in this group",
                job.id
            )));
        }
        job.cell.attach(self.signal.clone());
        self.jobs.push(job);
        // Wake a waiter that raced with the attach
        self.signal.notify();
        Ok(())
    }

    pub fn jobs(&self) -> &[JobHandle<B>] {
        &self.jobs
    }

    /// Wait for the whole group.
    ///
    /// Returns as soon as one member fails: unfinished siblings are killed,
    /// as are the failed job's remaining workers. Otherwise waits for every
    /// member. Either way the board is redrawn once more before the first
    /// failure, if any, is returned.
    pub async fn wait(&self) -> Result<(), EngineError> {
        let mut failed = None;
        self.signal
            .wait_until(|| {
                failed = self
                    .jobs
                    .iter()
                    .find(|job| job.status() == JobStatus::Failed)
                    .cloned();
                failed.is_some() || self.jobs.iter().all(JobHandle::is_terminal)
            })
            .await;

        match &failed {
            Some(failed) => {
                tracing::info!(job_id = %failed.id, "group member failed, aborting siblings");
                for job in self.jobs.iter().filter(|job| !job.is_terminal()) {
                    if let Err(e) = job.kill().await {
                        tracing::warn!(job_id = %job.id, error = %e, "could not kill sibling");
                    }
                }
                if let Err(e) = self.master.shared.publish_kill(&failed.id).await {
                    tracing::warn!(job_id = %failed.id, error = %e, "could not kill remaining workers");
                }
            }
            None => {
                for job in &self.jobs {
                    job.settled().await;
                }
            }
        }

        self.master.render();

        match failed {
            Some(failed) => failed.outcome().map(|_| ()),
            None => self
                .jobs
                .iter()
                .try_for_each(|job| job.outcome().map(|_| ())),
        }
    }

    /// Kill every member.
    pub async fn kill(&self) -> Result<(), EngineError> {
        for job in &self.jobs {
            job.kill().await?;
        }
        Ok(())
    }
}

impl<B: Broker, G: IdGen> Drop for Multi<'_, B, G> {
    fn drop(&mut self) {
        for job in &self.jobs {
            job.cell.detach(&self.signal);
        }

        let killed: Vec<JobHandle<B>> = self
            .jobs
            .iter()
            .filter(|job| job.mark_killed())
            .cloned()
            .collect();
        if killed.is_empty() {
            return;
        }

        // Members are already marked killed; the orders need the runtime
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    for job in killed {
                        if let Err(e) = job.announce_kill().await {
                            tracing::warn!(job_id = %job.id, error = %e, "could not kill group member");
                        }
                    }
                });
            }
            Err(_) => {
                for job in &killed {
                    tracing::warn!(job_id = %job.id, "no runtime left to publish kill for group member");
                }
            }
        }
    }
}
