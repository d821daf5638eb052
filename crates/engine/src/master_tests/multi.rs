// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn first_failure_aborts_the_group() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 2);
    let master = start_master(&broker).await;
    let mut group = master.multi_scope();
    let a = group.exec(script("sleep 10").tag("web").id("A")).await.unwrap();
    let b = group.exec(script("exit 1").tag("web").id("B")).await.unwrap();
    let c = group.exec(script("sleep 10").tag("web").id("C")).await.unwrap();

    report(&broker, "B", ProgressMessage::done(1, "boom")).await;
    let err = group.wait().await.unwrap_err();

    match err {
        EngineError::JobFailure { id, output } => {
            assert_eq!(id, "B");
            assert_eq!(output, "boom");
        }
        other => panic!("expected job failure, got {other:?}"),
    }
    assert_eq!(a.status(), JobStatus::Killed);
    assert_eq!(b.status(), JobStatus::Failed);
    assert_eq!(c.status(), JobStatus::Killed);

    let kills = orders(&broker, ALL_TAG);
    for id in ["A", "B", "C"] {
        assert!(
            kills.contains(&ControlMessage::Kill { id: JobId::new(id) }),
            "no kill for {id}"
        );
    }
}

#[tokio::test]
async fn group_waits_for_every_member() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let mut group = master.multi_scope();
    group.exec(script("true").tag("web").id("A")).await.unwrap();
    group.exec(script("true").tag("web").id("B")).await.unwrap();

    let fleet = async {
        report(&broker, "A", ProgressMessage::done(0, "")).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        report(&broker, "B", ProgressMessage::done(0, "")).await;
    };
    let (result, ()) = tokio::join!(group.wait(), fleet);

    result.unwrap();
    assert!(group
        .jobs()
        .iter()
        .all(|job| job.status() == JobStatus::Success));
    assert!(orders(&broker, ALL_TAG).is_empty());
}

#[tokio::test]
async fn killed_member_does_not_fail_the_group() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let mut group = master.multi_scope();
    let a = group.exec(script("sleep 10").tag("web").id("A")).await.unwrap();
    group.exec(script("true").tag("web").id("B")).await.unwrap();

    a.kill().await.unwrap();
    report(&broker, "B", ProgressMessage::done(0, "")).await;

    group.wait().await.unwrap();
}

#[tokio::test]
async fn adding_a_member_twice_is_rejected() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let mut group = master.multi_scope();
    let job = group.exec(script("true").tag("web")).await.unwrap();

    let err = group.add(job).unwrap_err();

    assert!(matches!(err, EngineError::InvalidRequest(_)));
    assert_eq!(group.jobs().len(), 1);
}

#[tokio::test]
async fn dropped_group_no_longer_hears_its_members() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("true").tag("web").id("J")).await.unwrap();
    report(&broker, "J", ProgressMessage::done(0, "")).await;
    job.wait().await.unwrap();

    let mut group = master.multi_scope();
    group.add(job.clone()).unwrap();
    drop(group);

    assert_eq!(job.status(), JobStatus::Success);
    assert!(orders(&broker, ALL_TAG).is_empty());
}

#[tokio::test]
async fn dropping_a_group_early_kills_unfinished_members() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;

    let a = {
        let mut group = master.multi_scope();
        let a = group.exec(script("sleep 10").tag("web").id("A")).await.unwrap();
        let err = group
            .exec(script("sleep 10").tag("web").num_workers(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Quorum(_)), "{err:?}");
        a
    };

    assert_eq!(a.status(), JobStatus::Killed);
    eventually("kill order", || {
        orders(&broker, ALL_TAG).contains(&ControlMessage::Kill { id: JobId::new("A") })
    })
    .await;
}

#[tokio::test]
async fn failed_dispatch_kills_dispatched_members() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;

    let err = master
        .multi([
            script("sleep 10").tag("web").id("A"),
            script("sleep 10").tag("web").num_workers(5),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Quorum(_)), "{err:?}");
    assert_eq!(
        orders(&broker, ALL_TAG),
        vec![ControlMessage::Kill { id: JobId::new("A") }]
    );
}

#[tokio::test]
async fn multi_returns_the_failure() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;

    let run = master.multi([
        script("true").tag("web").id("A"),
        script("false").tag("web").id("B"),
    ]);
    let fleet = async {
        eventually("dispatch", || orders(&broker, "web").len() == 2).await;
        report(&broker, "B", ProgressMessage::done(3, "exit 3")).await;
    };
    let (result, ()) = tokio::join!(run, fleet);

    assert!(matches!(result, Err(EngineError::JobFailure { ref id, .. }) if *id == "B"));
}

#[tokio::test]
async fn settling_a_member_leaves_the_verdict_to_the_group() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("false").tag("web").id("F")).await.unwrap();

    tokio::join!(
        job.settled(),
        report(&broker, "F", ProgressMessage::done(1, "nope"))
    );

    assert_eq!(job.status(), JobStatus::Failed);
    match job.wait().await.unwrap_err() {
        EngineError::JobFailure { id, output } => {
            assert_eq!(id, "F");
            assert_eq!(output, "nope");
        }
        other => panic!("expected job failure, got {other:?}"),
    }
}
