// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn slave_resubscribes_after_losing_the_broker() {
    let broker = MemoryBroker::new();
    let running = start_slave(&broker, &["web"]).await;

    broker.disconnect_all();
    eventually("resubscribe", || {
        broker.subscriber_count_now(&all_control_channel()) == 1
            && broker.subscriber_count_now(&fleet_core::channel::control_channel("web")) == 1
    })
    .await;

    let mut events = progress(&broker, "J");
    send(&broker, ControlMessage::Dispatch(order("J", 1, Payload::script("true")))).await;
    assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    assert!(!running.task.is_finished());
}

#[tokio::test]
async fn runs_survive_a_reconnect() {
    let broker = MemoryBroker::new();
    let running = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");
    send(&broker, ControlMessage::Dispatch(order("J", 1, Payload::script("sleep 30")))).await;
    next_event(&mut events).await;

    broker.disconnect_all();
    eventually("resubscribe", || {
        broker.subscriber_count_now(&all_control_channel()) == 1
    })
    .await;

    assert_eq!(running.slave.running(), vec![JobId::new("J")]);
    send(&broker, ControlMessage::Kill { id: JobId::new("J") }).await;
    eventually("run to stop", || running.slave.running().is_empty()).await;
}
