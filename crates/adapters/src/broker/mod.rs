// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish/subscribe broker adapters
//!
//! The broker is the only transport between masters and slaves. The
//! contract is deliberately small: publish, subscribe (with dynamic
//! subscribe/unsubscribe on an established subscription), a point-in-time
//! subscriber count, and atomic counters with expiry.

mod memory;
mod serve;
mod tcp;
mod traced;
pub mod wire;

pub use memory::{MemoryBroker, MemorySubscription};
pub use serve::serve_connection;
pub use tcp::{TcpBroker, TcpSubscription, DEFAULT_BROKER_ADDR};
pub use traced::TracedBroker;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use self::wire::WireError;

/// Errors from broker operations
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("connection lost")]
    ConnectionLost,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(WireError),
    #[error("broker error: {0}")]
    Remote(String),
    #[error("invalid broker url: {0}")]
    InvalidUrl(String),
}

impl From<WireError> for BrokerError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::ConnectionClosed => BrokerError::ConnectionLost,
            WireError::Io(io) => BrokerError::Io(io),
            other => BrokerError::Protocol(other),
        }
    }
}

/// A message delivered to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

/// An established subscription.
///
/// `messages` yields deliveries in publish order and returns `None` once
/// the underlying connection is gone. `handle` adds and removes channels on
/// the same connection.
pub struct Subscription<H> {
    pub handle: H,
    pub messages: mpsc::UnboundedReceiver<BusMessage>,
}

/// Control side of a [`Subscription`]
#[async_trait]
pub trait SubscriptionHandle: Clone + Send + Sync + 'static {
    /// Add a channel. Returns once the broker confirmed the subscription.
    async fn subscribe(&self, channel: &str) -> Result<(), BrokerError>;

    /// Remove a channel.
    async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError>;
}

/// Adapter for the pub/sub transport
#[async_trait]
pub trait Broker: Clone + Send + Sync + 'static {
    type Handle: SubscriptionHandle;

    /// Publish a message, returning how many subscribers received it.
    async fn publish(&self, channel: &str, message: &str) -> Result<usize, BrokerError>;

    /// Subscribe to `channels`. Returns once every channel is confirmed.
    async fn subscribe(
        &self,
        channels: &[String],
    ) -> Result<Subscription<Self::Handle>, BrokerError>;

    /// Number of subscribers currently on `channel`.
    async fn subscriber_count(&self, channel: &str) -> Result<usize, BrokerError>;

    /// Atomically increment the counter at `key` and return the new value.
    ///
    /// Missing or expired counters start from zero.
    async fn incr(&self, key: &str) -> Result<i64, BrokerError>;

    /// Set the counter at `key` to zero and expire it after `ttl`.
    async fn reset_counter(&self, key: &str, ttl: Duration) -> Result<(), BrokerError>;
}
