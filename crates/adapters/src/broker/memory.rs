// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker.
//!
//! Backs `fleetd` and doubles as the fake the engine is tested against:
//! a recording broker keeps every publish and subscriptions can be severed
//! on demand.

use super::{Broker, BrokerError, BusMessage, Subscription, SubscriptionHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Lifetime of a counter created by `incr` without a prior reset
pub const DEFAULT_COUNTER_TTL: Duration = Duration::from_secs(600);

struct Subscriber {
    channels: HashSet<String>,
    tx: mpsc::UnboundedSender<BusMessage>,
}

struct Counter {
    value: i64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        !matches!(self.expires_at, Some(at) if at <= now)
    }
}

#[derive(Default)]
struct MemoryState {
    subscribers: HashMap<u64, Subscriber>,
    counters: HashMap<String, Counter>,
    published: Vec<BusMessage>,
    record: bool,
    next_id: u64,
}

impl MemoryState {
    /// Drop every expired counter.
    fn sweep_counters(&mut self, now: Instant) {
        self.counters.retain(|_, counter| counter.is_live(now));
    }
}

/// In-memory broker shared by clones
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker that keeps every published message for inspection.
    #[cfg(any(test, feature = "test-support"))]
    pub fn recording() -> Self {
        let broker = Self::default();
        broker.inner.lock().record = true;
        broker
    }

    /// Publish synchronously. Closed subscribers are pruned on the way.
    pub fn publish_now(&self, channel: &str, message: &str) -> usize {
        let mut state = self.inner.lock();
        let msg = BusMessage {
            channel: channel.to_string(),
            payload: message.to_string(),
        };
        if state.record {
            state.published.push(msg.clone());
        }

        let mut delivered = 0;
        state.subscribers.retain(|_, sub| {
            if !sub.channels.contains(channel) {
                return !sub.tx.is_closed();
            }
            match sub.tx.send(msg.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    /// Subscribe synchronously.
    pub fn subscribe_now(&self, channels: &[String]) -> Subscription<MemorySubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.insert(
            id,
            Subscriber {
                channels: channels.iter().cloned().collect(),
                tx,
            },
        );
        Subscription {
            handle: MemorySubscription {
                broker: self.clone(),
                id,
            },
            messages: rx,
        }
    }

    pub fn subscriber_count_now(&self, channel: &str) -> usize {
        self.inner
            .lock()
            .subscribers
            .values()
            .filter(|sub| !sub.tx.is_closed() && sub.channels.contains(channel))
            .count()
    }

    pub fn incr_now(&self, key: &str) -> i64 {
        let now = Instant::now();
        let mut state = self.inner.lock();
        state.sweep_counters(now);
        let counter = state.counters.entry(key.to_string()).or_insert(Counter {
            value: 0,
            expires_at: Some(now + DEFAULT_COUNTER_TTL),
        });
        counter.value += 1;
        counter.value
    }

    pub fn reset_counter_now(&self, key: &str, ttl: Duration) {
        let now = Instant::now();
        let mut state = self.inner.lock();
        state.sweep_counters(now);
        state.counters.insert(
            key.to_string(),
            Counter {
                value: 0,
                expires_at: Some(now + ttl),
            },
        );
    }

    /// Current value of a live counter.
    #[cfg(any(test, feature = "test-support"))]
    pub fn counter(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        self.inner
            .lock()
            .counters
            .get(key)
            .filter(|c| c.is_live(now))
            .map(|c| c.value)
    }

    /// Every message published so far, in order (see [`MemoryBroker::recording`]).
    #[cfg(any(test, feature = "test-support"))]
    pub fn published(&self) -> Vec<BusMessage> {
        self.inner.lock().published.clone()
    }

    /// Payloads published on one channel, in order.
    #[cfg(any(test, feature = "test-support"))]
    pub fn published_on(&self, channel: &str) -> Vec<String> {
        self.inner
            .lock()
            .published
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.payload.clone())
            .collect()
    }

    /// Sever every subscription, as if the transport dropped.
    #[cfg(any(test, feature = "test-support"))]
    pub fn disconnect_all(&self) {
        self.inner.lock().subscribers.clear();
    }

    fn drop_subscriber(&self, id: u64) {
        self.inner.lock().subscribers.remove(&id);
    }

    fn update_channels(
        &self,
        id: u64,
        update: impl FnOnce(&mut HashSet<String>),
    ) -> Result<(), BrokerError> {
        let mut state = self.inner.lock();
        let sub = state
            .subscribers
            .get_mut(&id)
            .filter(|sub| !sub.tx.is_closed())
            .ok_or(BrokerError::ConnectionLost)?;
        update(&mut sub.channels);
        Ok(())
    }
}

/// Handle for a [`MemoryBroker`] subscription
#[derive(Clone)]
pub struct MemorySubscription {
    broker: MemoryBroker,
    id: u64,
}

impl MemorySubscription {
    pub fn subscribe_now(&self, channel: &str) -> Result<(), BrokerError> {
        self.broker.update_channels(self.id, |channels| {
            channels.insert(channel.to_string());
        })
    }

    pub fn unsubscribe_now(&self, channel: &str) -> Result<(), BrokerError> {
        self.broker.update_channels(self.id, |channels| {
            channels.remove(channel);
        })
    }

    /// Drop the subscription; its message stream ends.
    pub fn close(&self) {
        self.broker.drop_subscriber(self.id);
    }
}

#[async_trait]
impl SubscriptionHandle for MemorySubscription {
    async fn subscribe(&self, channel: &str) -> Result<(), BrokerError> {
        self.subscribe_now(channel)
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError> {
        self.unsubscribe_now(channel)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    type Handle = MemorySubscription;

    async fn publish(&self, channel: &str, message: &str) -> Result<usize, BrokerError> {
        Ok(self.publish_now(channel, message))
    }

    async fn subscribe(
        &self,
        channels: &[String],
    ) -> Result<Subscription<MemorySubscription>, BrokerError> {
        Ok(self.subscribe_now(channels))
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, BrokerError> {
        Ok(self.subscriber_count_now(channel))
    }

    async fn incr(&self, key: &str) -> Result<i64, BrokerError> {
        Ok(self.incr_now(key))
    }

    async fn reset_counter(&self, key: &str, ttl: Duration) -> Result<(), BrokerError> {
        self.reset_counter_now(key, ttl);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
