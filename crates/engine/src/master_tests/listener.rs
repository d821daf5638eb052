// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn malformed_progress_is_ignored() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 2);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("true").tag("web").id("J")).await.unwrap();

    broker
        .publish(&progress_channel(job.id()), "{not json")
        .await
        .unwrap();
    broker
        .publish(&progress_channel(job.id()), r#"{"type":"reboot"}"#)
        .await
        .unwrap();
    report(&broker, "J", ProgressMessage::Start).await;

    eventually("start", || job.status() == JobStatus::Started).await;
    assert_eq!(job.snapshot().num_started, 1);
}

#[tokio::test]
async fn surplus_acks_are_capped() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master
        .async_exec(script("true").tag("web").id("J").num_workers(1))
        .await
        .unwrap();

    report(&broker, "J", ProgressMessage::Start).await;
    report(&broker, "J", ProgressMessage::Start).await;
    eventually("running", || job.status() == JobStatus::Running).await;

    assert_eq!(job.snapshot().num_started, 1);
}

#[tokio::test]
async fn done_before_start_still_counts() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("true").tag("web").id("J")).await.unwrap();

    report(&broker, "J", ProgressMessage::done(0, "")).await;

    let finished = job.wait().await.unwrap();
    assert_eq!(finished.status, JobStatus::Success);
    assert_eq!(finished.num_started, 0);
}

#[tokio::test]
async fn finished_jobs_leave_the_registry_oldest_first() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let a = master.async_exec(script("true").tag("web").id("A")).await.unwrap();
    let b = master.async_exec(script("true").tag("web").id("B")).await.unwrap();

    report(&broker, "B", ProgressMessage::done(0, "")).await;
    b.wait().await.unwrap();
    let ids: Vec<JobId> = master.jobs().iter().map(|job| job.id().clone()).collect();
    assert_eq!(ids, vec![JobId::new("A"), JobId::new("B")]);

    report(&broker, "A", ProgressMessage::done(0, "")).await;
    a.wait().await.unwrap();
    assert!(master.jobs().is_empty());
}

#[tokio::test]
async fn finished_job_id_can_be_reused() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let first = master.async_exec(script("true").tag("web").id("J")).await.unwrap();
    report(&broker, "J", ProgressMessage::done(0, "")).await;
    first.wait().await.unwrap();

    let second = master.async_exec(script("true").tag("web").id("J")).await.unwrap();

    assert_eq!(second.status(), JobStatus::Idle);
    assert_eq!(first.status(), JobStatus::Success);
}

#[tokio::test]
async fn terminal_jobs_stop_listening() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("false").tag("web").id("J")).await.unwrap();

    report(&broker, "J", ProgressMessage::done(1, "bad")).await;

    assert!(job.wait().await.is_err());
    eventually("unsubscribe", || {
        broker.subscriber_count_now(&progress_channel(job.id())) == 0
    })
    .await;
}

#[tokio::test]
async fn losing_the_transport_kills_tracked_jobs() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("sleep 10").tag("web").id("J")).await.unwrap();

    broker.disconnect_all();

    let err = job.wait().await.unwrap_err();
    assert!(matches!(err, EngineError::Transport(_)), "{err:?}");
    assert_eq!(job.status(), JobStatus::Killed);
    assert!(orders(&broker, ALL_TAG).contains(&ControlMessage::Kill { id: JobId::new("J") }));

    let err = master.async_exec(script("true")).await.unwrap_err();
    assert!(matches!(err, EngineError::Transport(_)), "{err:?}");
}
