// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master: dispatches jobs to the fleet and tracks their progress.
//!
//! One listener task owns the progress subscription. It subscribes to a
//! permanent dummy channel so per-job progress channels can be added and
//! removed on the same connection. Every state change happens under the
//! board lock, which also serializes rendering: a render never sees a job
//! half-updated. Lock order is board, then job.

mod job;
mod multi;
mod progress;
mod request;

pub use job::JobHandle;
pub use multi::Multi;
pub use progress::{status_line, BoardStyle, ProgressBoard};
pub use request::ExecRequest;

use crate::env;
use crate::error::{EngineError, QuorumError};
use fleet_adapters::{Broker, BusMessage, SubscriptionHandle};
use fleet_core::channel::{
    all_control_channel, control_channel, job_id_from_progress_channel, progress_channel,
    worker_counter_key, DUMMY_PROGRESS_CHANNEL,
};
use fleet_core::{
    validate_tag, ControlMessage, Dispatch, IdGen, Job, JobId, ProgressMessage, TokenIdGen,
};
use indexmap::IndexMap;
use job::JobCell;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Master settings
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Lifetime of each job's worker-slot counter
    pub counter_ttl: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            counter_ttl: env::counter_ttl(),
        }
    }
}

/// Tracked jobs in dispatch order, plus their rendering
struct Board {
    jobs: IndexMap<JobId, Arc<JobCell>>,
    view: ProgressBoard,
}

impl Board {
    /// Render every tracked job, then drop finished jobs from the front.
    fn redraw(&mut self) {
        let snapshots: Vec<Job> = self.jobs.values().map(|cell| cell.snapshot()).collect();
        self.view.render(&snapshots);

        let mut finished = Vec::new();
        while let Some((_, cell)) = self.jobs.first() {
            if !cell.status().is_terminal() {
                break;
            }
            if let Some((id, _)) = self.jobs.shift_remove_index(0) {
                finished.push(id);
            }
        }
        self.view.commit(&finished);
    }
}

/// State shared by the master, its listener and every job handle
pub(crate) struct Shared<B: Broker> {
    broker: B,
    progress: B::Handle,
    board: Mutex<Board>,
    transport_error: Mutex<Option<String>>,
}

impl<B: Broker> Shared<B> {
    /// Mutate one job under the board lock, redraw, and wake its waiters.
    pub(crate) fn update<R>(&self, cell: &JobCell, change: impl FnOnce(&mut Job) -> R) -> R {
        let mut board = self.board.lock();
        let result = change(&mut cell.job.lock());
        board.redraw();
        cell.notify();
        result
    }

    /// Wait out a render in progress.
    pub(crate) fn settle(&self) {
        drop(self.board.lock());
    }

    pub(crate) fn redraw(&self) {
        self.board.lock().redraw();
    }

    pub(crate) fn transport_error(&self) -> Option<String> {
        self.transport_error.lock().clone()
    }

    pub(crate) async fn publish_kill(&self, id: &JobId) -> Result<(), EngineError> {
        let order = ControlMessage::Kill { id: id.clone() }.to_json()?;
        self.broker.publish(&all_control_channel(), &order).await?;
        Ok(())
    }

    /// Stop listening for a job's progress.
    pub(crate) async fn stop_tracking(&self, id: &JobId) {
        if let Err(e) = self.progress.unsubscribe(&progress_channel(id)).await {
            tracing::debug!(job_id = %id, error = %e, "progress unsubscribe failed");
        }
    }

    fn register(&self, job: Job) -> Result<Arc<JobCell>, EngineError> {
        let mut board = self.board.lock();
        if board.jobs.contains_key(&job.id) {
            return Err(EngineError::InvalidRequest(format!(
                "job {} is already in flight",
                job.id
            )));
        }
        let cell = Arc::new(JobCell::new(job));
        let id = cell.job.lock().id.clone();
        board.jobs.insert(id, Arc::clone(&cell));
        board.redraw();
        Ok(cell)
    }

    fn tracked(&self) -> Vec<(JobId, Arc<JobCell>)> {
        self.board
            .lock()
            .jobs
            .iter()
            .map(|(id, cell)| (id.clone(), Arc::clone(cell)))
            .collect()
    }

    async fn handle_progress(&self, msg: &BusMessage) {
        let Some(id) = job_id_from_progress_channel(&msg.channel) else {
            tracing::debug!(channel = %msg.channel, "ignoring message outside job progress");
            return;
        };
        let event = match ProgressMessage::parse(&msg.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "ignoring malformed progress message");
                return;
            }
        };
        let Some(cell) = self.board.lock().jobs.get(&id).cloned() else {
            tracing::debug!(job_id = %id, "progress for untracked job");
            return;
        };

        if let Some(status) = self.update(&cell, |job| job.apply(&event)) {
            tracing::debug!(job_id = %id, %status, "job status changed");
            if status.is_terminal() {
                self.stop_tracking(&id).await;
            }
        }
    }

    /// Progress can no longer be observed: kill everything we track.
    async fn lose_transport(&self, reason: &str) {
        tracing::error!(reason, "progress subscription lost");
        *self.transport_error.lock() = Some(reason.to_string());

        for (id, cell) in self.tracked() {
            if !self.update(&cell, Job::kill) {
                continue;
            }
            if let Err(e) = self.publish_kill(&id).await {
                tracing::warn!(job_id = %id, error = %e, "could not publish kill");
            }
        }
    }
}

async fn listen<B: Broker>(shared: Arc<Shared<B>>, mut messages: mpsc::UnboundedReceiver<BusMessage>) {
    while let Some(msg) = messages.recv().await {
        shared.handle_progress(&msg).await;
    }
    shared.lose_transport("connection lost").await;
}

/// Dispatches jobs and waits on their progress
pub struct Master<B: Broker, G: IdGen = TokenIdGen> {
    shared: Arc<Shared<B>>,
    ids: G,
    config: MasterConfig,
    listener: JoinHandle<()>,
}

impl<B: Broker> Master<B, TokenIdGen> {
    /// Start a master with random job ids and default settings.
    pub async fn connect(broker: B, view: ProgressBoard) -> Result<Self, EngineError> {
        Self::with_config(broker, view, TokenIdGen, MasterConfig::default()).await
    }
}

impl<B: Broker, G: IdGen> Master<B, G> {
    /// Subscribe the progress listener and start it.
    pub async fn with_config(
        broker: B,
        view: ProgressBoard,
        ids: G,
        config: MasterConfig,
    ) -> Result<Self, EngineError> {
        let subscription = broker
            .subscribe(&[DUMMY_PROGRESS_CHANNEL.to_string()])
            .await?;
        let shared = Arc::new(Shared {
            broker,
            progress: subscription.handle,
            board: Mutex::new(Board {
                jobs: IndexMap::new(),
                view,
            }),
            transport_error: Mutex::new(None),
        });
        let listener = tokio::spawn(listen(Arc::clone(&shared), subscription.messages));

        Ok(Self {
            shared,
            ids,
            config,
            listener,
        })
    }

    pub fn broker(&self) -> &B {
        &self.shared.broker
    }

    /// Workers currently subscribed to `tag`.
    ///
    /// A point-in-time estimate: workers may come and go before a dispatch
    /// lands.
    pub async fn num_workers_available(&self, tag: &str) -> Result<usize, EngineError> {
        validate_tag(tag)?;
        Ok(self
            .shared
            .broker
            .subscriber_count(&control_channel(tag))
            .await?)
    }

    /// Dispatch a job without waiting for it.
    ///
    /// The quorum check runs before anything is published, so a rejected
    /// request leaves no trace on the bus.
    pub async fn async_exec(&self, request: ExecRequest) -> Result<JobHandle<B>, EngineError> {
        validate_tag(&request.tag)?;
        if let Some(id) = &request.id {
            id.validate()?;
        }
        if let Some(reason) = self.shared.transport_error() {
            return Err(EngineError::Transport(reason));
        }

        let available = self.num_workers_available(&request.tag).await?;
        let num_workers = resolve_num_workers(&request.tag, request.num_workers, available)?;

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| JobId::new(self.ids.next()));
        let mut job = Job::new(id.clone(), request.tag.as_str(), num_workers);
        if let Some(name) = &request.name {
            job = job.with_name(name.as_str());
        }
        let cell = self.shared.register(job)?;
        let handle = JobHandle {
            id,
            cell,
            shared: Arc::clone(&self.shared),
        };

        if let Err(e) = self.dispatch(&handle, &request, num_workers).await {
            tracing::error!(job_id = %handle.id, error = %e, "dispatch failed");
            self.shared.update(&handle.cell, Job::kill);
            self.shared.stop_tracking(&handle.id).await;
            return Err(e);
        }
        Ok(handle)
    }

    async fn dispatch(
        &self,
        job: &JobHandle<B>,
        request: &ExecRequest,
        num_workers: usize,
    ) -> Result<(), EngineError> {
        // Subscribed before publishing so no start event is missed
        self.shared
            .progress
            .subscribe(&progress_channel(&job.id))
            .await?;
        self.shared
            .broker
            .reset_counter(&worker_counter_key(&job.id), self.config.counter_ttl)
            .await?;

        let order = ControlMessage::Dispatch(Dispatch {
            id: job.id.clone(),
            num_workers,
            payload: request.payload.clone(),
            tag: Some(request.tag.clone()),
            tags: request.only_tags.clone(),
        });
        let receivers = self
            .shared
            .broker
            .publish(&control_channel(&request.tag), &order.to_json()?)
            .await?;

        tracing::info!(
            job_id = %job.id,
            tag = %request.tag,
            num_workers,
            receivers,
            payload = %request.payload.describe(),
            "dispatched job"
        );
        Ok(())
    }

    /// Dispatch a job and wait for it to finish.
    pub async fn exec(&self, request: ExecRequest) -> Result<Job, EngineError> {
        self.async_exec(request).await?.wait().await
    }

    /// Open a fail-fast group. Jobs dispatched through it are waited on
    /// together.
    pub fn multi_scope(&self) -> Multi<'_, B, G> {
        Multi::new(self)
    }

    /// Dispatch every request as one fail-fast group and wait for all.
    ///
    /// If a dispatch fails, members already dispatched are killed.
    pub async fn multi(
        &self,
        requests: impl IntoIterator<Item = ExecRequest>,
    ) -> Result<(), EngineError> {
        let mut group = self.multi_scope();
        for request in requests {
            if let Err(e) = group.exec(request).await {
                if let Err(kill_err) = group.kill().await {
                    tracing::warn!(error = %kill_err, "could not kill group after failed dispatch");
                }
                return Err(e);
            }
        }
        group.wait().await
    }

    /// Tell every worker to drop everything it runs.
    ///
    /// Independent of the jobs this master tracks. Returns how many
    /// workers received the order.
    pub async fn kill_all(&self) -> Result<usize, EngineError> {
        let order = ControlMessage::KillAll.to_json()?;
        let receivers = self
            .shared
            .broker
            .publish(&all_control_channel(), &order)
            .await?;
        tracing::info!(receivers, "published killall");
        Ok(receivers)
    }

    /// Kill every job this master tracks.
    ///
    /// Keeps going past failures and returns the first one.
    pub async fn kill_all_jobs(&self) -> Result<(), EngineError> {
        let mut first_error = None;
        for job in self.jobs() {
            if let Err(e) = job.kill().await {
                tracing::warn!(job_id = %job.id, error = %e, "kill failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Jobs still in the registry, oldest first.
    pub fn jobs(&self) -> Vec<JobHandle<B>> {
        self.shared
            .tracked()
            .into_iter()
            .map(|(id, cell)| JobHandle {
                id,
                cell,
                shared: Arc::clone(&self.shared),
            })
            .collect()
    }

    /// Redraw the progress board.
    pub fn render(&self) {
        self.shared.redraw();
    }
}

impl<B: Broker, G: IdGen> Drop for Master<B, G> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn resolve_num_workers(
    tag: &str,
    requested: Option<usize>,
    available: usize,
) -> Result<usize, EngineError> {
    match requested {
        Some(0) => Err(EngineError::InvalidRequest(
            "num_workers must be at least 1".to_string(),
        )),
        Some(requested) if requested > available => Err(QuorumError::NotEnough {
            requested,
            available,
        }
        .into()),
        Some(requested) => Ok(requested),
        None if available == 0 => Err(QuorumError::NoWorkers {
            tag: tag.to_string(),
        }
        .into()),
        None => Ok(available),
    }
}

#[cfg(test)]
#[path = "../master_tests/mod.rs"]
mod tests;
