// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

async fn start_sleeper(broker: &MemoryBroker, id: &str) -> UnboundedReceiver<BusMessage> {
    let mut events = progress(broker, id);
    send(broker, ControlMessage::Dispatch(order(id, 1, Payload::script("sleep 30")))).await;
    assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    events
}

#[tokio::test]
async fn kill_stops_the_run_without_reporting_done() {
    let broker = MemoryBroker::new();
    let running = start_slave(&broker, &[]).await;
    let mut events = start_sleeper(&broker, "J").await;

    send(&broker, ControlMessage::Kill { id: JobId::new("J") }).await;

    eventually("run to stop", || running.slave.running().is_empty()).await;
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn kill_of_an_unknown_job_is_a_noop() {
    let broker = MemoryBroker::new();
    let running = start_slave(&broker, &[]).await;
    let mut events = start_sleeper(&broker, "J").await;

    assert!(!running.slave.kill_job(&JobId::new("other")).await);

    assert_eq!(running.slave.running(), vec![JobId::new("J")]);
    assert!(running.slave.kill_job(&JobId::new("J")).await);
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn killall_stops_every_run() {
    let broker = MemoryBroker::new();
    let running = start_slave(&broker, &[]).await;
    let _a = start_sleeper(&broker, "A").await;
    let _b = start_sleeper(&broker, "B").await;
    assert_eq!(running.slave.running().len(), 2);

    send(&broker, ControlMessage::KillAll).await;

    eventually("runs to stop", || running.slave.running().is_empty()).await;
}

#[tokio::test]
async fn redispatch_replaces_the_previous_run() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = start_sleeper(&broker, "J").await;

    // A master re-arms the counter on every dispatch
    broker.reset_counter_now(&worker_counter_key(&JobId::new("J")), Duration::from_secs(600));
    let again = Payload::script("echo again\nexit 2");
    send(&broker, ControlMessage::Dispatch(order("J", 1, again))).await;

    assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    assert_eq!(next_event(&mut events).await, ProgressMessage::done(2, "again\n"));
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn stubborn_payload_is_killed_after_the_grace_window() {
    let broker = MemoryBroker::new();
    let running = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");
    let payload = Payload::script("trap '' TERM\nsleep 30");
    send(&broker, ControlMessage::Dispatch(order("J", 1, payload))).await;
    next_event(&mut events).await;

    let started = std::time::Instant::now();
    assert!(running.slave.kill_job(&JobId::new("J")).await);

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(running.slave.running().is_empty());
}
