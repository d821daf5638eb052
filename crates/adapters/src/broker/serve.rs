// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server side of the TCP broker protocol.
//!
//! Each connection gets one outbound queue drained by a writer task, so
//! replies and pushed messages never interleave mid-frame. The first
//! `subscribe` request turns the connection into a subscription connection.

use super::memory::{MemoryBroker, MemorySubscription};
use super::wire::{read_frame, write_frame, Request, Response, WireError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

enum Outbound {
    Frame(Response),
    /// The subscription was severed; close the connection
    Hangup,
}

/// Serve one client connection until it closes.
pub async fn serve_connection<S>(stream: S, broker: MemoryBroker) -> Result<(), WireError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();

    let writer_task = tokio::spawn(async move {
        while let Some(outbound) = out_rx.recv().await {
            let response = match outbound {
                Outbound::Frame(response) => response,
                Outbound::Hangup => break,
            };
            if let Err(e) = write_frame(&mut writer, &response).await {
                debug!(error = %e, "connection writer stopped");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let mut subscription: Option<MemorySubscription> = None;
    let result = loop {
        let request: Request = match read_frame(&mut reader).await {
            Ok(request) => request,
            Err(WireError::ConnectionClosed) => break Ok(()),
            Err(e) => break Err(e),
        };

        let response = match request {
            Request::Ping => Response::Pong,
            Request::Publish { channel, message } => Response::Published {
                receivers: broker.publish_now(&channel, &message),
            },
            Request::NumSub { channel } => Response::Count {
                count: broker.subscriber_count_now(&channel),
            },
            Request::Incr { key } => Response::Value {
                value: broker.incr_now(&key),
            },
            Request::ResetCounter { key, ttl_secs } => {
                broker.reset_counter_now(&key, Duration::from_secs(ttl_secs));
                Response::Ok
            }
            Request::Subscribe { channels } => {
                match &subscription {
                    Some(handle) => subscribe_all(handle, &channels),
                    None => {
                        let sub = broker.subscribe_now(&channels);
                        // The ack goes out ahead of any pushed message
                        let ack = Response::Subscribed { channels };
                        if out_tx.send(Outbound::Frame(ack)).is_err() {
                            sub.handle.close();
                            break Ok(());
                        }
                        let mut messages = sub.messages;
                        let forward_tx = out_tx.clone();
                        tokio::spawn(async move {
                            while let Some(msg) = messages.recv().await {
                                let push = Response::Message {
                                    channel: msg.channel,
                                    payload: msg.payload,
                                };
                                if forward_tx.send(Outbound::Frame(push)).is_err() {
                                    return;
                                }
                            }
                            let _ = forward_tx.send(Outbound::Hangup);
                        });
                        subscription = Some(sub.handle);
                        continue;
                    }
                }
            }
            Request::Unsubscribe { channel } => match &subscription {
                Some(handle) => match handle.unsubscribe_now(&channel) {
                    Ok(()) => Response::Unsubscribed { channel },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                },
                None => Response::Error {
                    message: "not subscribed".to_string(),
                },
            },
        };

        if out_tx.send(Outbound::Frame(response)).is_err() {
            break Ok(());
        }
    };

    if let Some(handle) = subscription {
        handle.close();
    }
    drop(out_tx);
    let _ = writer_task.await;
    result
}

fn subscribe_all(handle: &MemorySubscription, channels: &[String]) -> Response {
    for channel in channels {
        if let Err(e) = handle.subscribe_now(channel) {
            return Response::Error {
                message: e.to_string(),
            };
        }
    }
    Response::Subscribed {
        channels: channels.to_vec(),
    }
}
