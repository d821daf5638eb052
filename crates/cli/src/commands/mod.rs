// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand handlers

pub mod exec;
pub mod kill_all;
pub mod listen;
pub mod workers;
