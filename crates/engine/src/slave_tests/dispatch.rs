// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[tokio::test]
async fn successful_run_reports_start_then_done() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");

    send(&broker, ControlMessage::Dispatch(order("J", 1, Payload::script("echo hi")))).await;

    assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    assert_eq!(
        next_event(&mut events).await,
        ProgressMessage::Done { status: 0, output: None }
    );
}

#[tokio::test]
async fn failing_run_reports_its_output() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");

    let payload = Payload::script("echo oops >&2\nexit 3");
    send(&broker, ControlMessage::Dispatch(order("J", 1, payload))).await;

    assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    assert_eq!(next_event(&mut events).await, ProgressMessage::done(3, "oops\n"));
}

#[tokio::test]
async fn payload_sees_its_slot() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");

    let payload = Payload::script("echo \"$WORKER_INDEX of $NUM_WORKERS\"\nexit 1");
    send(&broker, ControlMessage::Dispatch(order("J", 1, payload))).await;

    next_event(&mut events).await;
    assert_eq!(next_event(&mut events).await, ProgressMessage::done(1, "0 of 1\n"));
}

#[tokio::test]
async fn exec_payload_runs_without_a_shell() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");

    let payload = Payload::exec(["sh", "-c", "echo $0; exit 4", "literal $HOME"]);
    send(&broker, ControlMessage::Dispatch(order("J", 1, payload))).await;

    next_event(&mut events).await;
    assert_eq!(
        next_event(&mut events).await,
        ProgressMessage::done(4, "literal $HOME\n")
    );
}

#[tokio::test]
async fn only_the_requested_number_of_slaves_run() {
    let broker = MemoryBroker::new();
    let _slaves = [
        start_slave(&broker, &[]).await,
        start_slave(&broker, &[]).await,
        start_slave(&broker, &[]).await,
    ];
    let mut events = progress(&broker, "J");

    let payload = Payload::script("echo $WORKER_INDEX\nexit 7");
    send(&broker, ControlMessage::Dispatch(order("J", 2, payload))).await;

    let mut outputs = Vec::new();
    while outputs.len() < 2 {
        if let ProgressMessage::Done { output, .. } = next_event(&mut events).await {
            outputs.push(output.unwrap_or_default());
        }
    }
    outputs.sort();
    assert_eq!(outputs, vec!["0\n", "1\n"]);
    assert_quiet(&mut events).await;
    assert_eq!(broker.counter(&worker_counter_key(&JobId::new("J"))), Some(3));
}

#[parameterized(
    matching = { &["web"], Some(vec!["web".to_string(), "db".to_string()]), true },
    unfiltered = { &["web"], None, true },
    other_tags = { &["web"], Some(vec!["db".to_string()]), false },
    untagged_slave = { &[], Some(vec!["db".to_string()]), false },
)]
#[test_macro(tokio::test)]
async fn dispatch_tag_filter(own: &[&str], wanted: Option<Vec<String>>, runs: bool) {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, own).await;
    let mut events = progress(&broker, "J");

    let mut filtered = order("J", 1, Payload::script("true"));
    filtered.tags = wanted;
    send(&broker, ControlMessage::Dispatch(filtered)).await;

    if runs {
        assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    } else {
        assert_quiet(&mut events).await;
        assert_eq!(broker.counter(&worker_counter_key(&JobId::new("J"))), None);
    }
}

#[tokio::test]
async fn unspawnable_payload_reports_failure() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");

    let payload = Payload::exec(["/nonexistent/fleet-test-binary"]);
    send(&broker, ControlMessage::Dispatch(order("J", 1, payload))).await;

    assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    match next_event(&mut events).await {
        ProgressMessage::Done { status, output } => {
            assert_eq!(status, 1);
            assert!(output.unwrap_or_default().contains("failed to spawn"));
        }
        other => panic!("expected done, got {other:?}"),
    }
}

#[tokio::test]
async fn signalled_payload_reports_shell_status() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");

    let payload = Payload::script("echo dying\nkill -9 $$");
    send(&broker, ControlMessage::Dispatch(order("J", 1, payload))).await;

    next_event(&mut events).await;
    assert_eq!(next_event(&mut events).await, ProgressMessage::done(137, "dying\n"));
}

#[tokio::test]
async fn malformed_orders_are_ignored() {
    let broker = MemoryBroker::new();
    let running = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "J");

    broker.publish(&all_control_channel(), "][").await.unwrap();
    broker
        .publish(&all_control_channel(), r#"{"type":"reboot"}"#)
        .await
        .unwrap();
    send(&broker, ControlMessage::Dispatch(order("J", 1, Payload::script("true")))).await;

    assert_eq!(next_event(&mut events).await, ProgressMessage::Start);
    assert!(!running.task.is_finished());
}

#[tokio::test]
async fn orders_with_unusable_ids_are_dropped() {
    let broker = MemoryBroker::new();
    let _slave = start_slave(&broker, &[]).await;
    let mut events = progress(&broker, "");

    send(&broker, ControlMessage::Dispatch(order("", 1, Payload::script("true")))).await;

    assert_quiet(&mut events).await;
    assert_eq!(broker.counter(&worker_counter_key(&JobId::new(""))), None);
}

#[test]
fn invalid_tags_are_rejected() {
    let err = Slave::new(MemoryBroker::new(), config(&["web,db"])).err();
    assert!(matches!(err, Some(EngineError::InvalidTag(_))));
}
