// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::broker::MemoryBroker;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}");
}

#[test]
#[serial(tracing)]
fn publish_logs_channel_and_receivers() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedBroker::new(MemoryBroker::new());
        traced.publish("fleet:control:web", "{}").await
    });

    assert_eq!(result.unwrap(), 0);
    assert_log(&logs, "span name", "broker.publish");
    assert_log(&logs, "channel", "fleet:control:web");
    assert_log(&logs, "completion", "published");
}

#[test]
#[serial(tracing)]
fn subscribe_logs_timing() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedBroker::new(MemoryBroker::new());
        traced.subscribe(&["a".to_string()]).await.map(|_| ())
    });

    assert!(result.is_ok());
    assert_log(&logs, "span name", "broker.subscribe");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[tokio::test]
async fn delegates_to_inner_broker() {
    let broker = MemoryBroker::new();
    let traced = TracedBroker::new(broker.clone());
    let mut sub = traced.subscribe(&["a".to_string()]).await.unwrap();

    assert_eq!(traced.subscriber_count("a").await.unwrap(), 1);
    assert_eq!(traced.publish("a", "x").await.unwrap(), 1);
    assert_eq!(sub.messages.recv().await.unwrap().payload, "x");

    traced
        .reset_counter("k", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(traced.incr("k").await.unwrap(), 1);
    assert_eq!(broker.counter("k"), Some(1));
}
