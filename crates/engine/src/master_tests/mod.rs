// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master tests against the in-memory broker

mod exec;
mod kill;
mod listener;
mod multi;

use super::*;
use fleet_adapters::{MemoryBroker, MemorySubscription, Subscription};
use fleet_core::channel::slave_channels;
use fleet_core::{JobStatus, Payload, SequentialIdGen, ALL_TAG};

type TestMaster = Master<MemoryBroker, SequentialIdGen>;

async fn start_master(broker: &MemoryBroker) -> TestMaster {
    Master::with_config(
        broker.clone(),
        ProgressBoard::off(),
        SequentialIdGen::default(),
        MasterConfig {
            counter_ttl: Duration::from_secs(600),
        },
    )
    .await
    .unwrap()
}

/// Subscriptions standing in for `n` slaves listening on `tag`.
fn workers(broker: &MemoryBroker, tag: &str, n: usize) -> Vec<Subscription<MemorySubscription>> {
    (0..n)
        .map(|_| broker.subscribe_now(&slave_channels(&[tag.to_string()])))
        .collect()
}

fn script(body: &str) -> ExecRequest {
    ExecRequest::new(Payload::script(body))
}

/// Publish a progress event as a worker would.
async fn report(broker: &MemoryBroker, id: &str, event: ProgressMessage) {
    let channel = progress_channel(&JobId::new(id));
    broker
        .publish(&channel, &event.to_json().unwrap())
        .await
        .unwrap();
}

/// Control orders published on `tag`'s channel, parsed.
fn orders(broker: &MemoryBroker, tag: &str) -> Vec<ControlMessage> {
    broker
        .published_on(&control_channel(tag))
        .iter()
        .map(|raw| ControlMessage::parse(raw).unwrap())
        .collect()
}

/// Poll `check` until it holds, failing the test after two seconds.
async fn eventually(what: &str, check: impl Fn() -> bool) {
    let poll = async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(2), poll)
        .await
        .is_err()
    {
        panic!("timed out waiting for {what}");
    }
}
