// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleetd: broker server for fleet masters and slaves
//!
//! Serves publish/subscribe and worker-slot counters over TCP. State lives
//! in memory only; restarting the daemon drops subscriptions and counters.

use fleet_daemon::config::USAGE;
use fleet_daemon::{Config, Invocation, Server};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Invocation::Run(config)) => config,
        Ok(Invocation::Version) => {
            println!("fleetd {VERSION}");
            return Ok(());
        }
        Ok(Invocation::Help) => {
            println!("fleetd {VERSION}");
            println!("Broker server for the fleet job dispatcher");
            println!();
            println!("{USAGE}");
            println!();
            println!("OPTIONS:");
            println!("    --bind ADDR        Listen address [env: FLEET_BIND, default: 127.0.0.1:7420]");
            println!("    --log-file PATH    Log to PATH instead of stderr [env: FLEET_LOG_FILE]");
            println!("    -h, --help         Print help information");
            println!("    -v, --version      Print version information");
            return Ok(());
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let _log_guard = setup_logging(&config)?;

    let server = Server::bind(&config.bind).await?;
    let addr = server.local_addr()?;
    info!(%addr, "broker listening");

    // Signal ready for parent process (scripts, tests) waiting on startup
    println!("READY {addr}");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    server
        .run(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigint.recv() => info!("received SIGINT"),
            }
        })
        .await;

    info!("fleetd stopped");
    Ok(())
}

fn setup_logging(
    config: &Config,
) -> std::io::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = &config.log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other(format!("not a file path: {}", path.display())))?;

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
