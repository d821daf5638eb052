// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet workers`: count the workers listening on a tag

use anyhow::Result;
use clap::Args;
use fleet_core::ALL_TAG;
use fleet_engine::{Master, ProgressBoard};

use crate::FleetBroker;

#[derive(Args, Debug)]
pub struct WorkersArgs {
    /// Tag to count
    #[arg(short = 't', long = "tag", default_value = ALL_TAG)]
    pub tag: String,
}

pub async fn handle(args: WorkersArgs, broker: FleetBroker) -> Result<()> {
    let master = Master::connect(broker, ProgressBoard::off()).await?;
    let available = master.num_workers_available(&args.tag).await?;
    println!("{available}");
    Ok(())
}
