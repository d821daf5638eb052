// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slave: listens for orders and runs payloads.
//!
//! Every slave subscribes to its tags' control channels plus the `_all_`
//! channel. Slaves race on a broker-side counter to claim one of a job's
//! worker slots; the ones that land outside the requested count drop the
//! order. Each run executes in its own task and is tracked in a
//! [`RunTable`](runs::RunTable), which the run re-checks on every poll.

mod runs;

use crate::env;
use crate::error::EngineError;
use fleet_adapters::{Broker, BusMessage, ProcessRunner, RunnerConfig};
use fleet_core::channel::{progress_channel, slave_channels, worker_counter_key};
use fleet_core::payload::{NUM_WORKERS_ENV, WORKER_INDEX_ENV};
use fleet_core::{validate_tag, ControlMessage, Dispatch, JobId, ProgressMessage};
use runs::RunTable;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Slave settings
#[derive(Debug, Clone)]
pub struct SlaveConfig {
    /// Tags this slave answers to, besides `_all_`
    pub tags: Vec<String>,
    /// Wait before resubscribing after the connection dropped
    pub retry: Duration,
    pub runner: RunnerConfig,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            retry: env::retry_ms(),
            runner: RunnerConfig::default(),
        }
    }
}

/// Executes orders received from masters
pub struct Slave<B: Broker> {
    broker: B,
    tags: Vec<String>,
    retry: Duration,
    runner: ProcessRunner,
    runs: Arc<RunTable>,
}

impl<B: Broker> Slave<B> {
    pub fn new(broker: B, config: SlaveConfig) -> Result<Self, EngineError> {
        for tag in &config.tags {
            validate_tag(tag)?;
        }
        Ok(Self {
            broker,
            tags: config.tags,
            retry: config.retry,
            runner: ProcessRunner::new(config.runner),
            runs: Arc::new(RunTable::default()),
        })
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Ids of the jobs running here.
    pub fn running(&self) -> Vec<JobId> {
        self.runs.ids()
    }

    /// Serve orders forever.
    ///
    /// A lost connection is not fatal: the slave resubscribes after the
    /// retry delay and keeps the runs it already tracks.
    pub async fn listen(&self) {
        let channels = slave_channels(&self.tags);
        let mut connected = false;
        loop {
            match self.broker.subscribe(&channels).await {
                Ok(subscription) => {
                    if !connected {
                        tracing::info!(?channels, "connected, listening for orders");
                        connected = true;
                    } else {
                        tracing::info!("reconnected");
                    }
                    let mut messages = subscription.messages;
                    while let Some(msg) = messages.recv().await {
                        self.handle(&msg).await;
                    }
                    tracing::warn!(retry_ms = self.retry.as_millis() as u64, "connection lost, retrying");
                }
                Err(e) => {
                    tracing::warn!(error = %e, retry_ms = self.retry.as_millis() as u64, "subscribe failed, retrying");
                }
            }
            tokio::time::sleep(self.retry).await;
        }
    }

    async fn handle(&self, msg: &BusMessage) {
        let order = match ControlMessage::parse(&msg.payload) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(channel = %msg.channel, error = %e, "ignoring malformed order");
                return;
            }
        };
        match order {
            ControlMessage::KillAll => self.kill_all_jobs().await,
            ControlMessage::Kill { id } => {
                self.kill_job(&id).await;
            }
            ControlMessage::Dispatch(order) => self.dispatch(order).await,
        }
    }

    /// Stop the local run of `id` and wait for its process to be reaped.
    ///
    /// Returns whether a run was stopped.
    pub async fn kill_job(&self, id: &JobId) -> bool {
        let Some(task) = self.runs.take(id) else {
            return false;
        };
        tracing::info!(job_id = %id, "terminating job");
        if let Err(e) = task.await {
            tracing::warn!(job_id = %id, error = %e, "job task did not finish cleanly");
        }
        true
    }

    /// Stop every local run.
    pub async fn kill_all_jobs(&self) {
        for (id, task) in self.runs.take_all() {
            tracing::info!(job_id = %id, "terminating job");
            if let Err(e) = task.await {
                tracing::warn!(job_id = %id, error = %e, "job task did not finish cleanly");
            }
        }
    }

    async fn dispatch(&self, order: Dispatch) {
        if let Err(e) = order.id.validate() {
            tracing::warn!(error = %e, "ignoring order with an unusable job id");
            return;
        }
        if !order.accepts(&self.tags) {
            tracing::debug!(job_id = %order.id, "order not for our tags");
            return;
        }

        // One run per job id
        self.kill_job(&order.id).await;

        let slot = match self.broker.incr(&worker_counter_key(&order.id)).await {
            Ok(count) => count - 1,
            Err(e) => {
                tracing::warn!(job_id = %order.id, error = %e, "could not claim a worker slot");
                return;
            }
        };
        let worker_index = match usize::try_from(slot) {
            Ok(index) if index < order.num_workers => index,
            _ => {
                tracing::debug!(job_id = %order.id, slot, "all worker slots taken");
                return;
            }
        };

        let run = Run {
            broker: self.broker.clone(),
            runner: self.runner.clone(),
            runs: Arc::clone(&self.runs),
            worker_index,
        };
        let span = tracing::info_span!("job", job_id = %order.id, worker_index);
        self.runs.start(order.id.clone(), move |generation| {
            tokio::spawn(run.execute(order, generation).instrument(span))
        });
    }
}

/// One claimed worker slot of a job
struct Run<B: Broker> {
    broker: B,
    runner: ProcessRunner,
    runs: Arc<RunTable>,
    worker_index: usize,
}

impl<B: Broker> Run<B> {
    async fn execute(self, order: Dispatch, generation: u64) {
        let still_wanted = || self.runs.is_current(&order.id, generation);
        if !still_wanted() {
            return;
        }

        tracing::info!(
            payload = %order.payload.describe(),
            num_workers = order.num_workers,
            "running job"
        );
        self.report(&order.id, &ProgressMessage::Start).await;

        let env = [
            (WORKER_INDEX_ENV.to_string(), self.worker_index.to_string()),
            (NUM_WORKERS_ENV.to_string(), order.num_workers.to_string()),
        ];
        let done = match self.runner.run_payload(&order.payload, &env, still_wanted).await {
            Ok(outcome) if outcome.cancelled => {
                tracing::info!(status = outcome.status(), "job terminated");
                None
            }
            Ok(outcome) => {
                tracing::info!(status = outcome.status(), "job exited");
                Some(ProgressMessage::done(outcome.status(), outcome.output))
            }
            Err(e) => {
                tracing::error!(error = %e, "could not run job");
                Some(ProgressMessage::done(1, e.to_string()))
            }
        };

        if let Some(done) = done {
            self.report(&order.id, &done).await;
        }
        self.runs.finish(&order.id, generation);
    }

    async fn report(&self, id: &JobId, event: &ProgressMessage) {
        let sent = match event.to_json() {
            Ok(json) => self.broker.publish(&progress_channel(id), &json).await.map(|_| ()),
            Err(e) => {
                tracing::error!(error = %e, "could not encode progress");
                return;
            }
        };
        if let Err(e) = sent {
            tracing::warn!(error = %e, "could not report progress");
        }
    }
}

#[cfg(test)]
#[path = "../slave_tests/mod.rs"]
mod tests;
