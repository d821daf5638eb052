// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleet - run commands across a fleet of workers

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod color;
mod commands;
mod env;
mod exit_error;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{exec, kill_all, listen, workers};
use fleet_adapters::{TcpBroker, TracedBroker, DEFAULT_BROKER_ADDR};

/// Broker stack every command talks through
pub(crate) type FleetBroker = TracedBroker<TcpBroker>;

#[derive(Parser, Debug)]
#[command(
    name = "fleet",
    version,
    about = "Run commands across a fleet of workers",
    styles = color::styles()
)]
struct Cli {
    /// Broker URL [env: FLEET_BROKER_URL] [default: tcp://127.0.0.1:7420]
    #[arg(long = "broker", value_name = "URL", global = true)]
    broker: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a worker and execute incoming jobs
    Listen(listen::ListenArgs),
    /// Run a command or script on workers and wait for it
    Exec(exec::ExecArgs),
    /// Tell every worker to stop all of its jobs
    KillAll,
    /// Print how many workers listen on a tag
    Workers(workers::WorkersArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, the
/// "Caused by" chain is skipped. Otherwise the full chain is rendered.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

fn broker_url(flag: Option<String>) -> String {
    flag.or_else(env::broker_url)
        .unwrap_or_else(|| format!("tcp://{DEFAULT_BROKER_ADDR}"))
}

/// Log to stderr, `RUST_LOG` overriding `default`.
fn setup_logging(default: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            // No subcommand: print help and exit 0
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            return Ok(());
        }
    };

    // Info logs would tear through the live progress board
    setup_logging(match command {
        Commands::Listen(_) => "info",
        _ => "warn",
    });

    let broker = TracedBroker::new(TcpBroker::new(&broker_url(cli.broker))?);

    match command {
        Commands::Listen(args) => listen::handle(args, broker).await,
        Commands::Exec(args) => exec::handle(args, broker).await,
        Commands::KillAll => kill_all::handle(broker).await,
        Commands::Workers(args) => workers::handle(args, broker).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
