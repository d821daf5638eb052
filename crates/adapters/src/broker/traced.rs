// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced broker wrapper for consistent observability

use super::{Broker, BrokerError, Subscription};
use async_trait::async_trait;
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any Broker
#[derive(Clone)]
pub struct TracedBroker<B> {
    inner: B,
}

impl<B> TracedBroker<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: Broker> Broker for TracedBroker<B> {
    type Handle = B::Handle;

    async fn publish(&self, channel: &str, message: &str) -> Result<usize, BrokerError> {
        async {
            tracing::debug!(len = message.len(), "publishing");
            let result = self.inner.publish(channel, message).await;
            match &result {
                Ok(receivers) => tracing::debug!(receivers, "published"),
                Err(e) => tracing::error!(error = %e, "publish failed"),
            }
            result
        }
        .instrument(tracing::debug_span!("broker.publish", channel))
        .await
    }

    async fn subscribe(
        &self,
        channels: &[String],
    ) -> Result<Subscription<Self::Handle>, BrokerError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.subscribe(channels).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "subscribed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "subscribe failed"),
            }
            result
        }
        .instrument(tracing::info_span!("broker.subscribe", channels = ?channels))
        .await
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, BrokerError> {
        let result = self.inner.subscriber_count(channel).await;
        match &result {
            Ok(count) => tracing::debug!(channel, count, "counted subscribers"),
            Err(e) => tracing::error!(channel, error = %e, "subscriber count failed"),
        }
        result
    }

    async fn incr(&self, key: &str) -> Result<i64, BrokerError> {
        let result = self.inner.incr(key).await;
        tracing::trace!(key, value = ?result.as_ref().ok(), "incremented");
        if let Err(ref e) = result {
            tracing::error!(key, error = %e, "incr failed");
        }
        result
    }

    async fn reset_counter(&self, key: &str, ttl: Duration) -> Result<(), BrokerError> {
        let result = self.inner.reset_counter(key, ttl).await;
        tracing::debug_span!("broker.reset_counter", key, ttl_secs = ttl.as_secs()).in_scope(
            || match &result {
                Ok(()) => tracing::debug!("counter reset"),
                Err(e) => tracing::error!(error = %e, "reset failed"),
            },
        );
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
