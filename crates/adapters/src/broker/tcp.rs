// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP client for `fleetd`.
//!
//! Commands share one lazily (re)connected connection. Every subscription
//! opens its own connection, on which the server acknowledges
//! subscribe/unsubscribe requests in order and pushes message frames.

use super::wire::{read_frame, write_frame, Request, Response};
use super::{Broker, BrokerError, BusMessage, Subscription, SubscriptionHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Address used when no broker URL is configured.
pub const DEFAULT_BROKER_ADDR: &str = "127.0.0.1:7420";

const URL_SCHEME: &str = "tcp://";

type PendingAcks = Arc<Mutex<VecDeque<oneshot::Sender<Result<(), BrokerError>>>>>;

/// Broker client speaking the `fleetd` protocol
#[derive(Clone)]
pub struct TcpBroker {
    addr: String,
    command: Arc<tokio::sync::Mutex<Option<TcpStream>>>,
}

impl TcpBroker {
    /// Create a client for `url` (`tcp://host:port` or `host:port`).
    ///
    /// No connection is made until the first request.
    pub fn new(url: &str) -> Result<Self, BrokerError> {
        let addr = url.strip_prefix(URL_SCHEME).unwrap_or(url);
        if addr.is_empty() || !addr.contains(':') || addr.contains('/') {
            return Err(BrokerError::InvalidUrl(url.to_string()));
        }
        Ok(Self {
            addr: addr.to_string(),
            command: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn request(&self, request: Request) -> Result<Response, BrokerError> {
        let mut guard = self.command.lock().await;
        if guard.is_none() {
            *guard = Some(TcpStream::connect(&self.addr).await?);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(BrokerError::ConnectionLost);
        };

        let result = async {
            write_frame(stream, &request).await?;
            read_frame::<Response, _>(stream).await
        }
        .await;

        match result {
            Ok(Response::Error { message }) => Err(BrokerError::Remote(message)),
            Ok(response) => Ok(response),
            Err(e) => {
                // Drop the broken connection; the next request reconnects
                *guard = None;
                Err(e.into())
            }
        }
    }
}

fn unexpected(response: Response) -> BrokerError {
    BrokerError::Remote(format!("unexpected response: {response:?}"))
}

#[async_trait]
impl Broker for TcpBroker {
    type Handle = TcpSubscription;

    async fn publish(&self, channel: &str, message: &str) -> Result<usize, BrokerError> {
        match self
            .request(Request::Publish {
                channel: channel.to_string(),
                message: message.to_string(),
            })
            .await?
        {
            Response::Published { receivers } => Ok(receivers),
            other => Err(unexpected(other)),
        }
    }

    async fn subscribe(
        &self,
        channels: &[String],
    ) -> Result<Subscription<TcpSubscription>, BrokerError> {
        let stream = TcpStream::connect(&self.addr).await?;
        let (mut reader, mut writer) = stream.into_split();

        write_frame(
            &mut writer,
            &Request::Subscribe {
                channels: channels.to_vec(),
            },
        )
        .await?;
        match read_frame::<Response, _>(&mut reader).await? {
            Response::Subscribed { .. } => {}
            Response::Error { message } => return Err(BrokerError::Remote(message)),
            other => return Err(unexpected(other)),
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let pending = PendingAcks::default();
        tokio::spawn(read_pushes(reader, tx, Arc::clone(&pending)));

        Ok(Subscription {
            handle: TcpSubscription {
                writer: Arc::new(tokio::sync::Mutex::new(writer)),
                pending,
            },
            messages: rx,
        })
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, BrokerError> {
        match self
            .request(Request::NumSub {
                channel: channel.to_string(),
            })
            .await?
        {
            Response::Count { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, BrokerError> {
        match self
            .request(Request::Incr {
                key: key.to_string(),
            })
            .await?
        {
            Response::Value { value } => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    async fn reset_counter(&self, key: &str, ttl: Duration) -> Result<(), BrokerError> {
        match self
            .request(Request::ResetCounter {
                key: key.to_string(),
                ttl_secs: ttl.as_secs(),
            })
            .await?
        {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

/// Reader task for a subscription connection.
///
/// Ends when the connection closes or the subscriber goes away; dropping
/// `tx` ends the message stream and dropping pending acks fails waiters.
async fn read_pushes(
    mut reader: OwnedReadHalf,
    tx: mpsc::UnboundedSender<BusMessage>,
    pending: PendingAcks,
) {
    loop {
        match read_frame::<Response, _>(&mut reader).await {
            Ok(Response::Message { channel, payload }) => {
                if tx.send(BusMessage { channel, payload }).is_err() {
                    break;
                }
            }
            Ok(Response::Subscribed { .. }) | Ok(Response::Unsubscribed { .. }) => {
                if let Some(ack) = pending.lock().pop_front() {
                    let _ = ack.send(Ok(()));
                }
            }
            Ok(Response::Error { message }) => {
                if let Some(ack) = pending.lock().pop_front() {
                    let _ = ack.send(Err(BrokerError::Remote(message)));
                }
            }
            Ok(other) => debug!(response = ?other, "ignoring frame on subscription"),
            Err(e) => {
                debug!(error = %e, "subscription connection closed");
                break;
            }
        }
    }
    pending.lock().clear();
}

/// Handle for a [`TcpBroker`] subscription
#[derive(Clone)]
pub struct TcpSubscription {
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    pending: PendingAcks,
}

impl TcpSubscription {
    async fn send_and_ack(&self, request: Request) -> Result<(), BrokerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let mut writer = self.writer.lock().await;
            self.pending.lock().push_back(ack_tx);
            write_frame(&mut *writer, &request).await?;
        }
        ack_rx.await.map_err(|_| BrokerError::ConnectionLost)?
    }
}

#[async_trait]
impl SubscriptionHandle for TcpSubscription {
    async fn subscribe(&self, channel: &str) -> Result<(), BrokerError> {
        self.send_and_ack(Request::Subscribe {
            channels: vec![channel.to_string()],
        })
        .await
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError> {
        self.send_and_ack(Request::Unsubscribe {
            channel: channel.to_string(),
        })
        .await
    }
}

#[cfg(test)]
#[path = "tcp_tests.rs"]
mod tests;
