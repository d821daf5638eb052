// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs a slave is executing, one per job id

use fleet_core::JobId;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::task::JoinHandle;

struct RunRecord {
    generation: u64,
    task: JoinHandle<()>,
}

/// Registry of live runs.
///
/// A run stays wanted for as long as its record, with its generation, is
/// present. Removing the record is how a run is cancelled: the run polls
/// [`RunTable::is_current`] and tears its process down once it turns false.
#[derive(Default)]
pub(crate) struct RunTable {
    inner: Mutex<RunsInner>,
}

#[derive(Default)]
struct RunsInner {
    records: HashMap<JobId, RunRecord>,
    next_generation: u64,
}

impl RunTable {
    /// Register a run for `id`, spawning it with a fresh generation.
    ///
    /// The caller must have torn down any previous run for `id`.
    pub(crate) fn start(&self, id: JobId, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
        let mut inner = self.inner.lock();
        inner.next_generation += 1;
        let generation = inner.next_generation;
        // The task blocks on this lock before its first check, so it never
        // sees itself missing
        let task = spawn(generation);
        if let Some(stale) = inner.records.insert(id, RunRecord { generation, task }) {
            stale.task.abort();
        }
    }

    pub(crate) fn is_current(&self, id: &JobId, generation: u64) -> bool {
        self.inner
            .lock()
            .records
            .get(id)
            .is_some_and(|record| record.generation == generation)
    }

    /// Remove a finished run's record, unless a newer run replaced it.
    pub(crate) fn finish(&self, id: &JobId, generation: u64) {
        let mut inner = self.inner.lock();
        if inner
            .records
            .get(id)
            .is_some_and(|record| record.generation == generation)
        {
            inner.records.remove(id);
        }
    }

    /// Withdraw the run for `id`, returning its task to await.
    pub(crate) fn take(&self, id: &JobId) -> Option<JoinHandle<()>> {
        self.inner.lock().records.remove(id).map(|record| record.task)
    }

    /// Withdraw every run.
    pub(crate) fn take_all(&self) -> Vec<(JobId, JoinHandle<()>)> {
        self.inner
            .lock()
            .records
            .drain()
            .map(|(id, record)| (id, record.task))
            .collect()
    }

    pub(crate) fn ids(&self) -> Vec<JobId> {
        self.inner.lock().records.keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
