// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet kill-all`: stop every job on every worker

use anyhow::Result;
use fleet_engine::{Master, ProgressBoard};

use crate::FleetBroker;

pub async fn handle(broker: FleetBroker) -> Result<()> {
    let master = Master::connect(broker, ProgressBoard::off()).await?;
    let receivers = master.kill_all().await?;
    println!("killall sent to {receivers} {}", plural(receivers, "worker"));
    Ok(())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
