// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn kills(broker: &MemoryBroker) -> Vec<JobId> {
    orders(broker, ALL_TAG)
        .into_iter()
        .filter_map(|order| match order {
            ControlMessage::Kill { id } => Some(id),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn kill_publishes_a_single_order() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 2);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("sleep 10").tag("web").id("J")).await.unwrap();

    assert!(job.kill().await.unwrap());
    assert!(!job.kill().await.unwrap());

    assert_eq!(job.status(), JobStatus::Killed);
    assert_eq!(kills(&broker), vec![JobId::new("J")]);
}

#[tokio::test]
async fn waiting_on_a_killed_job_is_not_an_error() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("sleep 10").tag("web")).await.unwrap();

    let waiter = job.clone();
    let waiting = tokio::spawn(async move { waiter.wait().await });
    job.kill().await.unwrap();

    let killed = waiting.await.unwrap().unwrap();
    assert_eq!(killed.status, JobStatus::Killed);
    assert_eq!(killed.output.as_deref(), Some(fleet_core::KILLED_OUTPUT));
}

#[tokio::test]
async fn killing_a_finished_job_publishes_nothing() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("true").tag("web").id("J")).await.unwrap();

    report(&broker, "J", ProgressMessage::Start).await;
    report(&broker, "J", ProgressMessage::done(0, "")).await;
    job.wait().await.unwrap();

    assert!(!job.kill().await.unwrap());
    assert_eq!(job.status(), JobStatus::Success);
    assert!(kills(&broker).is_empty());
}

#[tokio::test]
async fn kill_stops_listening_for_progress() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let job = master.async_exec(script("sleep 10").tag("web").id("J")).await.unwrap();

    job.kill().await.unwrap();
    report(&broker, "J", ProgressMessage::done(1, "late")).await;

    assert_eq!(broker.subscriber_count_now(&progress_channel(job.id())), 0);
    assert_eq!(job.status(), JobStatus::Killed);
}

#[tokio::test]
async fn kill_all_reaches_every_worker() {
    let broker = MemoryBroker::recording();
    let _web = workers(&broker, "web", 2);
    let _db = workers(&broker, "db", 1);
    let master = start_master(&broker).await;

    let receivers = master.kill_all().await.unwrap();

    assert_eq!(receivers, 3);
    assert_eq!(orders(&broker, ALL_TAG), vec![ControlMessage::KillAll]);
}

#[tokio::test]
async fn kill_all_jobs_kills_only_unfinished_jobs() {
    let broker = MemoryBroker::recording();
    let _workers = workers(&broker, "web", 1);
    let master = start_master(&broker).await;
    let a = master.async_exec(script("sleep 10").tag("web").id("A")).await.unwrap();
    let b = master.async_exec(script("sleep 10").tag("web").id("B")).await.unwrap();
    let c = master.async_exec(script("false").tag("web").id("C")).await.unwrap();
    report(&broker, "C", ProgressMessage::done(1, "nope")).await;
    eventually("C to fail", || c.status() == JobStatus::Failed).await;

    master.kill_all_jobs().await.unwrap();

    assert_eq!(a.status(), JobStatus::Killed);
    assert_eq!(b.status(), JobStatus::Killed);
    assert_eq!(c.status(), JobStatus::Failed);
    assert_eq!(kills(&broker), vec![JobId::new("A"), JobId::new("B")]);
}
