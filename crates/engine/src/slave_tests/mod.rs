// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slave tests: real payloads, in-memory broker

mod dispatch;
mod kill;
mod reconnect;

use super::*;
use fleet_adapters::MemoryBroker;
use fleet_core::channel::all_control_channel;
use fleet_core::Payload;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

fn config(tags: &[&str]) -> SlaveConfig {
    SlaveConfig {
        tags: tags.iter().map(|t| t.to_string()).collect(),
        retry: Duration::from_millis(20),
        runner: RunnerConfig {
            poll_interval: Duration::from_millis(10),
            kill_grace: Duration::from_millis(300),
            echo: false,
        },
    }
}

/// A slave listening in the background; stops listening on drop.
struct Running {
    slave: Arc<Slave<MemoryBroker>>,
    task: JoinHandle<()>,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn start_slave(broker: &MemoryBroker, tags: &[&str]) -> Running {
    let before = broker.subscriber_count_now(&all_control_channel());
    let slave = Arc::new(Slave::new(broker.clone(), config(tags)).unwrap());
    let listener = Arc::clone(&slave);
    let task = tokio::spawn(async move { listener.listen().await });
    eventually("slave subscription", || {
        broker.subscriber_count_now(&all_control_channel()) == before + 1
    })
    .await;
    Running { slave, task }
}

fn order(id: &str, num_workers: usize, payload: Payload) -> Dispatch {
    Dispatch {
        id: JobId::new(id),
        num_workers,
        payload,
        tag: None,
        tags: None,
    }
}

async fn send(broker: &MemoryBroker, order: ControlMessage) {
    broker
        .publish(&all_control_channel(), &order.to_json().unwrap())
        .await
        .unwrap();
}

/// Progress events for `id`, as the master would see them.
fn progress(broker: &MemoryBroker, id: &str) -> UnboundedReceiver<BusMessage> {
    broker
        .subscribe_now(&[progress_channel(&JobId::new(id))])
        .messages
}

async fn next_event(events: &mut UnboundedReceiver<BusMessage>) -> ProgressMessage {
    match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
        Ok(Some(msg)) => ProgressMessage::parse(&msg.payload).unwrap(),
        Ok(None) => panic!("progress stream closed"),
        Err(_) => panic!("timed out waiting for progress"),
    }
}

async fn assert_quiet(events: &mut UnboundedReceiver<BusMessage>) {
    if let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(200), events.recv()).await {
        panic!("unexpected progress: {}", msg.payload);
    }
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    let poll = async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .is_err()
    {
        panic!("timed out waiting for {what}");
    }
}
