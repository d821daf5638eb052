// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet listen`: run a slave

use anyhow::Result;
use clap::Args;
use fleet_core::channel::parse_tag_list;
use fleet_engine::{Slave, SlaveConfig};

use crate::FleetBroker;

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Comma-separated tags this worker answers to, besides _all_
    #[arg(short = 't', long = "tags", value_name = "TAGS")]
    pub tags: Option<String>,
}

impl ListenArgs {
    pub fn config(&self) -> SlaveConfig {
        SlaveConfig {
            tags: self.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
            ..SlaveConfig::default()
        }
    }
}

pub async fn handle(args: ListenArgs, broker: FleetBroker) -> Result<()> {
    let slave = Slave::new(broker, args.config())?;
    eprintln!("Listening for orders (tags: {})", describe_tags(slave.tags()));

    tokio::select! {
        () = slave.listen() => {}
        interrupted = tokio::signal::ctrl_c() => {
            interrupted?;
            eprintln!();
            slave.kill_all_jobs().await;
        }
    }
    Ok(())
}

fn describe_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        "none".to_string()
    } else {
        tags.join(",")
    }
}

#[cfg(test)]
#[path = "listen_tests.rs"]
mod tests;
