// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accept loop serving the broker protocol from one shared store.

use fleet_adapters::broker::serve_connection;
use fleet_adapters::MemoryBroker;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn, Instrument};

/// Broker server: every connection shares one [`MemoryBroker`]
pub struct Server {
    listener: TcpListener,
    broker: MemoryBroker,
}

impl Server {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            broker: MemoryBroker::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already open are dropped with the runtime.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(%peer, error = %e, "could not set TCP_NODELAY");
                        }
                        let broker = self.broker.clone();
                        let span = tracing::info_span!("conn", %peer);
                        tokio::spawn(
                            async move {
                                debug!("client connected");
                                match serve_connection(stream, broker).await {
                                    Ok(()) => debug!("client disconnected"),
                                    Err(e) => warn!(error = %e, "connection error"),
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                () = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
