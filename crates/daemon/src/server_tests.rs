// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_adapters::{Broker, TcpBroker};
use std::time::Duration;
use tokio::sync::oneshot;

async fn start() -> (TcpBroker, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run(async move {
        let _ = stop_rx.await;
    }));
    (TcpBroker::new(&format!("tcp://{addr}")).unwrap(), stop_tx, task)
}

#[tokio::test]
async fn clients_share_one_store() {
    let (broker, _stop, _task) = start().await;
    let other = TcpBroker::new(broker.addr()).unwrap();

    let mut sub = broker.subscribe(&["news".to_string()]).await.unwrap();
    assert_eq!(other.subscriber_count("news").await.unwrap(), 1);
    assert_eq!(other.publish("news", "hello").await.unwrap(), 1);

    let msg = tokio::time::timeout(Duration::from_secs(2), sub.messages.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg.payload, "hello");

    assert_eq!(broker.incr("slots").await.unwrap(), 1);
    assert_eq!(other.incr("slots").await.unwrap(), 2);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let (broker, stop, task) = start().await;
    broker.publish("warmup", "x").await.unwrap();

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();

    let fresh = TcpBroker::new(broker.addr()).unwrap();
    assert!(fresh.publish("news", "late").await.is_err());
}

#[tokio::test]
async fn binding_a_taken_port_fails() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();

    assert!(Server::bind(&addr).await.is_err());
}
