// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::broker::{serve_connection, MemoryBroker};
use tokio::net::TcpListener;
use yare::parameterized;

/// Serve `broker` on an ephemeral port and return a client for it.
async fn start_server(broker: MemoryBroker) -> TcpBroker {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_connection(stream, broker.clone()));
        }
    });
    TcpBroker::new(&format!("tcp://{addr}")).unwrap()
}

fn channels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[parameterized(
    with_scheme = { "tcp://127.0.0.1:7420", "127.0.0.1:7420" },
    bare = { "localhost:9000", "localhost:9000" },
)]
fn url_parsing(url: &str, addr: &str) {
    assert_eq!(TcpBroker::new(url).unwrap().addr(), addr);
}

#[parameterized(
    empty = { "" },
    no_port = { "tcp://localhost" },
    redis_scheme = { "redis://localhost:6379" },
)]
fn invalid_urls(url: &str) {
    assert!(matches!(TcpBroker::new(url), Err(BrokerError::InvalidUrl(_))));
}

#[tokio::test]
async fn publish_reaches_remote_subscriber() {
    let client = start_server(MemoryBroker::new()).await;
    let mut sub = client.subscribe(&channels(&["x"])).await.unwrap();

    assert_eq!(client.publish("x", "hello").await.unwrap(), 1);

    let msg = sub.messages.recv().await.unwrap();
    assert_eq!(msg.channel, "x");
    assert_eq!(msg.payload, "hello");
}

#[tokio::test]
async fn dynamic_subscribe_is_acknowledged() {
    let client = start_server(MemoryBroker::new()).await;
    let mut sub = client.subscribe(&channels(&["base"])).await.unwrap();

    sub.handle.subscribe("extra").await.unwrap();
    assert_eq!(client.subscriber_count("extra").await.unwrap(), 1);
    client.publish("extra", "1").await.unwrap();
    assert_eq!(sub.messages.recv().await.unwrap().payload, "1");

    sub.handle.unsubscribe("extra").await.unwrap();
    assert_eq!(client.subscriber_count("extra").await.unwrap(), 0);
    assert_eq!(client.subscriber_count("base").await.unwrap(), 1);
}

#[tokio::test]
async fn counters_are_shared_through_the_server() {
    let broker = MemoryBroker::new();
    let client = start_server(broker.clone()).await;

    client
        .reset_counter("k", Duration::from_secs(600))
        .await
        .unwrap();
    assert_eq!(client.incr("k").await.unwrap(), 1);
    assert_eq!(client.incr("k").await.unwrap(), 2);
    assert_eq!(broker.counter("k"), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscribe_is_acknowledged_before_pushed_messages() {
    let broker = MemoryBroker::new();
    let client = start_server(broker.clone()).await;
    let flood = {
        let broker = broker.clone();
        tokio::spawn(async move {
            loop {
                broker.publish_now("busy", "tick");
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..50 {
        let mut sub = client.subscribe(&channels(&["busy"])).await.unwrap();
        let msg = sub.messages.recv().await.unwrap();
        assert_eq!(msg.payload, "tick");
    }
    flood.abort();
}

#[tokio::test]
async fn server_side_disconnect_ends_the_stream() {
    let broker = MemoryBroker::new();
    let client = start_server(broker.clone()).await;
    let mut sub = client.subscribe(&channels(&["x"])).await.unwrap();

    broker.disconnect_all();

    assert!(sub.messages.recv().await.is_none());
}

#[tokio::test]
async fn unreachable_broker_is_an_io_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = TcpBroker::new(&addr.to_string()).unwrap();
    assert!(matches!(
        client.publish("x", "1").await,
        Err(BrokerError::Io(_))
    ));
}
