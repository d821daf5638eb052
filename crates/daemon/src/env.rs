// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Listen address override
pub fn bind_addr() -> Option<String> {
    std::env::var("FLEET_BIND").ok().filter(|s| !s.is_empty())
}

/// Log to this file instead of stderr
pub fn log_file() -> Option<PathBuf> {
    std::env::var("FLEET_LOG_FILE")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}
