// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Payload output poll interval (default: 100ms).
pub fn poll_ms() -> Duration {
    parse_duration_ms("FLEET_POLL_MS").unwrap_or(Duration::from_millis(100))
}

/// Grace window between SIGTERM and SIGKILL (default: 2000ms).
pub fn kill_grace_ms() -> Duration {
    parse_duration_ms("FLEET_KILL_GRACE_MS").unwrap_or(Duration::from_secs(2))
}
