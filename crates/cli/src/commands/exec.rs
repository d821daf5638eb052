// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet exec`: dispatch a job and follow it to completion

use anyhow::{bail, Context, Result};
use clap::Args;
use fleet_core::{Payload, ALL_TAG};
use fleet_engine::{EngineError, ExecRequest, Master, ProgressBoard};
use std::path::PathBuf;

use crate::color;
use crate::exit_error::{ExitError, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_QUORUM};
use crate::FleetBroker;

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Run the script in PATH
    #[arg(short = 'f', long = "file", value_name = "PATH", conflicts_with = "cmd")]
    pub file: Option<PathBuf>,

    /// Run ARGS as one shell command line
    #[arg(short = 'c', long = "cmd")]
    pub cmd: bool,

    /// Exact number of workers (default: every available worker)
    #[arg(short = 'n', long = "num-workers", value_name = "N")]
    pub num_workers: Option<usize>,

    /// Job id (default: random)
    #[arg(long = "id")]
    pub id: Option<String>,

    /// Tag whose workers receive the job
    #[arg(short = 't', long = "tag", default_value = ALL_TAG)]
    pub tag: String,

    /// Name shown on the progress board
    #[arg(long = "name")]
    pub name: Option<String>,

    /// Program and arguments, or a command line with --cmd
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl ExecArgs {
    /// What the workers will run.
    ///
    /// Plain ARGS are exec'd as-is without a shell.
    pub fn payload(&self) -> Result<Payload> {
        if let Some(path) = &self.file {
            if !self.args.is_empty() {
                bail!("--file takes no ARGS");
            }
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            return Ok(Payload::script(script));
        }
        if self.args.is_empty() {
            bail!("nothing to run: pass ARGS or --file");
        }
        if self.cmd {
            return Ok(Payload::inline_command(&self.args));
        }
        Ok(Payload::exec(self.args.iter().cloned()))
    }

    pub fn request(&self) -> Result<ExecRequest> {
        let mut request = ExecRequest::new(self.payload()?).tag(self.tag.clone());
        if let Some(n) = self.num_workers {
            request = request.num_workers(n);
        }
        if let Some(id) = &self.id {
            request = request.id(id.as_str());
        }
        if let Some(name) = &self.name {
            request = request.name(name.clone());
        }
        Ok(request)
    }
}

pub async fn handle(args: ExecArgs, broker: FleetBroker) -> Result<()> {
    let request = args.request()?;
    let master = Master::connect(broker, ProgressBoard::stderr()).await?;

    let outcome = tokio::select! {
        outcome = master.exec(request) => outcome,
        interrupted = tokio::signal::ctrl_c() => {
            interrupted?;
            eprintln!();
            if let Err(e) = master.kill_all_jobs().await {
                tracing::warn!(error = %e, "could not kill every job");
            }
            return Err(ExitError::silent(EXIT_INTERRUPTED).into());
        }
    };

    match outcome {
        Ok(_) => Ok(()),
        Err(EngineError::JobFailure { output, .. }) => {
            eprint!("{}", failure_report(&output));
            Err(ExitError::silent(EXIT_FAILURE).into())
        }
        Err(EngineError::Quorum(e)) => Err(ExitError::new(EXIT_QUORUM, e.to_string()).into()),
        Err(e) => Err(e.into()),
    }
}

/// Banner, rule, then the remote output.
fn failure_report(output: &str) -> String {
    let mut report = format!("{}\n{}\n{output}", color::failure("JOB FAILURE:"), "-".repeat(80));
    if !report.ends_with('\n') {
        report.push('\n');
    }
    report
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
