// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast wakeups for predicate waiters.
//!
//! A `Signal` carries no data. Notifiers bump a generation counter after
//! changing shared state; waiters re-check their predicate on every bump.
//! A waiter subscribes before its first check, so a notify that lands
//! between the check and the await is never lost.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<u64>>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Wake every current waiter.
    pub fn notify(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Block until `predicate` holds.
    ///
    /// Wakeups may be spurious; the predicate is the only source of truth.
    pub async fn wait_until(&self, mut predicate: impl FnMut() -> bool) {
        let mut rx = self.tx.subscribe();
        loop {
            rx.borrow_and_update();
            if predicate() {
                return;
            }
            // The sender lives as long as `self`
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether both handles refer to the same signal.
    pub fn same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("generation", &*self.tx.borrow())
            .finish()
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
