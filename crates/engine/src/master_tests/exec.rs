// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    too_many = { Some(3), 2, QuorumError::NotEnough { requested: 3, available: 2 } },
    none_available = { None, 0, QuorumError::NoWorkers { tag: "web".to_string() } },
)]
#[test_macro(tokio::test)]
async fn quorum_errors_publish_nothing(
    requested: Option<usize>,
    available: usize,
    expected: QuorumError,
) {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", available);
    let master = start_master(&broker).await;

    let mut request = script("echo hi").tag("web");
    request.num_workers = requested;
    let err = master.async_exec(request).await.unwrap_err();

    assert!(matches!(err, EngineError::Quorum(ref q) if *q == expected), "{err:?}");
    assert!(broker.published().is_empty());
    assert!(master.jobs().is_empty());
}

#[tokio::test]
async fn unspecified_worker_count_is_discovered() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 3);
    let master = start_master(&broker).await;

    let job = master.async_exec(script("echo hi").tag("web")).await.unwrap();

    assert_eq!(job.snapshot().num_workers, 3);
    let published = orders(&broker, "web");
    let [ControlMessage::Dispatch(order)] = published.as_slice() else {
        panic!("expected one dispatch");
    };
    assert_eq!(order.num_workers, 3);
    assert_eq!(order.id, *job.id());
    assert_eq!(order.tag.as_deref(), Some("web"));
    assert_eq!(order.payload, Payload::Script("#!/bin/bash\necho hi".to_string()));
}

#[tokio::test]
async fn dispatch_arms_the_worker_counter() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, ALL_TAG, 1);
    let master = start_master(&broker).await;

    let job = master.async_exec(script("true").id("ABC")).await.unwrap();

    assert_eq!(job.id(), &JobId::new("ABC"));
    assert_eq!(broker.counter(&worker_counter_key(job.id())), Some(0));
    assert_eq!(
        broker.subscriber_count_now(&progress_channel(job.id())),
        1,
        "master listens on the job's progress channel"
    );
}

#[tokio::test]
async fn only_tags_travel_with_the_order() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, ALL_TAG, 1);
    let master = start_master(&broker).await;

    master
        .async_exec(script("true").only_tags(vec!["db".to_string()]))
        .await
        .unwrap();

    let published = orders(&broker, ALL_TAG);
    let [ControlMessage::Dispatch(order)] = published.as_slice() else {
        panic!("expected one dispatch");
    };
    assert_eq!(order.tags, Some(vec!["db".to_string()]));
}

#[tokio::test]
async fn multi_tag_is_rejected_before_dispatch() {
    let broker = MemoryBroker::recording();
    let master = start_master(&broker).await;

    let err = master
        .async_exec(script("true").tag("web,db"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidTag(_)));
    assert!(broker.published().is_empty());
}

#[parameterized(
    empty = { "" },
    colon = { "a:b" },
    spaced = { "my job" },
)]
#[test_macro(tokio::test)]
async fn unsafe_job_ids_are_rejected_before_dispatch(id: &str) {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;

    let err = master
        .async_exec(script("true").tag("web").id(id))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidJobId(_)), "{err:?}");
    assert!(broker.published().is_empty());
    assert!(master.jobs().is_empty());
    assert_eq!(broker.subscriber_count_now(&progress_channel(&JobId::new(id))), 0);
}

#[tokio::test]
async fn exec_returns_after_every_worker_succeeds() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 2);
    let master = start_master(&broker).await;

    let run = master.exec(script("true").tag("web").id("J"));
    let fleet = async {
        eventually("dispatch", || !orders(&broker, "web").is_empty()).await;
        for _ in 0..2 {
            report(&broker, "J", ProgressMessage::Start).await;
        }
        for _ in 0..2 {
            report(&broker, "J", ProgressMessage::done(0, "")).await;
        }
    };
    let (result, ()) = tokio::join!(run, fleet);

    let job = result.unwrap();
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.num_completed, 2);
    assert_eq!(job.output, None);
}

#[tokio::test]
async fn exec_surfaces_the_failing_output() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 2);
    let master = start_master(&broker).await;

    let run = master.exec(script("false").tag("web").id("J"));
    let fleet = async {
        eventually("dispatch", || !orders(&broker, "web").is_empty()).await;
        report(&broker, "J", ProgressMessage::Start).await;
        report(&broker, "J", ProgressMessage::done(2, "disk full")).await;
    };
    let (result, ()) = tokio::join!(run, fleet);

    match result {
        Err(EngineError::JobFailure { id, output }) => {
            assert_eq!(id, "J");
            assert_eq!(output, "disk full");
        }
        other => panic!("expected job failure, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_in_flight_id_is_rejected() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;

    master.async_exec(script("true").tag("web").id("J")).await.unwrap();
    let err = master
        .async_exec(script("true").tag("web").id("J"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidRequest(_)));
    assert_eq!(orders(&broker, "web").len(), 1);
}

#[tokio::test]
async fn zero_workers_requested_is_invalid() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;

    let err = master
        .async_exec(script("true").tag("web").num_workers(0))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn workers_available_counts_tag_subscribers() {
    let broker = MemoryBroker::new();
    let _web = workers(&broker, "web", 2);
    let _db = workers(&broker, "db", 1);
    let master = start_master(&broker).await;

    assert_eq!(master.num_workers_available("web").await.unwrap(), 2);
    assert_eq!(master.num_workers_available("db").await.unwrap(), 1);
    assert_eq!(master.num_workers_available(ALL_TAG).await.unwrap(), 3);
}
