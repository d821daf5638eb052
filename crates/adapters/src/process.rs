// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload execution with process-group cancellation
//!
//! The payload runs as the leader of a new process group with stdout and
//! stderr sharing one pipe. The runner polls that pipe with a short timeout
//! and re-checks a caller-supplied `still_wanted` predicate on every
//! iteration. Once the run is no longer wanted the whole group receives
//! SIGTERM and, if the leader has not exited within the grace window,
//! SIGKILL. The child is always reaped.

use crate::env;
use fleet_core::Payload;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{pipe2, Pid};
use std::io::Write;
use std::os::fd::OwnedFd;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tokio::time::{timeout, Instant};

/// Delay between spawn attempts while the script is still busy
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Spawn attempts on ETXTBSY before giving up
const SPAWN_ATTEMPTS: u32 = 20;

const READ_CHUNK: usize = 4096;

/// Errors from running a payload
#[derive(Debug, Error)]
pub enum RunError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to signal process group: {0}")]
    Signal(#[source] Errno),
}

/// Runner timing and echo settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Output poll timeout; bounds how long cancellation goes unnoticed
    pub poll_interval: Duration,
    /// Wait between SIGTERM and SIGKILL
    pub kill_grace: Duration,
    /// Copy payload output to our stderr as it arrives
    pub echo: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: env::poll_ms(),
            kill_grace: env::kill_grace_ms(),
            echo: true,
        }
    }
}

/// Result of one payload run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Combined stdout and stderr
    pub output: String,
    pub exit_code: Option<i32>,
    /// Signal that ended the process, if any
    pub signal: Option<i32>,
    /// The run was cancelled through `still_wanted`
    pub cancelled: bool,
}

impl RunOutcome {
    fn from_status(output: Vec<u8>, status: ExitStatus, cancelled: bool) -> Self {
        Self {
            output: String::from_utf8_lossy(&output).into_owned(),
            exit_code: status.code(),
            signal: status.signal(),
            cancelled,
        }
    }

    /// Shell-style status: the exit code, or 128 + signal number.
    pub fn status(&self) -> i32 {
        match (self.exit_code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs payloads as cancellable process groups
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a dispatch payload.
    ///
    /// Scripts are written to a temporary executable that lives until the
    /// run ends.
    pub async fn run_payload<F>(
        &self,
        payload: &Payload,
        env: &[(String, String)],
        still_wanted: F,
    ) -> Result<RunOutcome, RunError>
    where
        F: Fn() -> bool,
    {
        match payload {
            Payload::Exec(args) => self.run(args, env, still_wanted).await,
            Payload::Script(script) => {
                let path = materialize_script(script)?;
                let argv = vec![path.to_string_lossy().into_owned()];
                let result = self.run(&argv, env, still_wanted).await;
                drop(path);
                result
            }
        }
    }

    /// Run `argv` until it exits or `still_wanted` turns false.
    pub async fn run<F>(
        &self,
        argv: &[String],
        env: &[(String, String)],
        still_wanted: F,
    ) -> Result<RunOutcome, RunError>
    where
        F: Fn() -> bool,
    {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;
        let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).map_err(std::io::Error::from)?;

        let mut child = spawn_with_retry(program, args, env, write_end).await?;
        let pgid = child
            .id()
            .map(|pid| Pid::from_raw(pid as i32))
            .ok_or_else(|| std::io::Error::other("child exited before it was tracked"))?;
        tracing::debug!(pid = pgid.as_raw(), program, "payload started");

        let mut reader = pipe::Receiver::from_owned_fd(read_end)?;
        let mut echo = tokio::io::stderr();
        let mut output = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        let mut eof = false;

        let status = loop {
            if !still_wanted() {
                let status = self.terminate(&mut child, pgid).await?;
                return Ok(RunOutcome::from_status(output, status, true));
            }

            tokio::select! {
                biased;
                read = reader.read(&mut buf), if !eof => match read {
                    Ok(0) => eof = true,
                    Ok(n) => {
                        output.extend_from_slice(&buf[..n]);
                        if self.config.echo {
                            let _ = echo.write_all(&buf[..n]).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "lost payload output pipe");
                        eof = true;
                    }
                },
                status = child.wait() => break status?,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        };

        if !eof {
            self.drain(&mut reader, &mut output).await;
        }
        tracing::debug!(pid = pgid.as_raw(), ?status, "payload exited");
        Ok(RunOutcome::from_status(output, status, false))
    }

    /// Collect output still buffered after the leader exited.
    ///
    /// Stops at the first quiet poll so a background grandchild holding the
    /// pipe open cannot stall the run.
    async fn drain(&self, reader: &mut pipe::Receiver, output: &mut Vec<u8>) {
        let deadline = Instant::now() + self.config.kill_grace;
        let mut buf = [0u8; READ_CHUNK];
        while Instant::now() < deadline {
            match timeout(self.config.poll_interval, reader.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => {
                    output.extend_from_slice(&buf[..n]);
                    if self.config.echo {
                        let _ = tokio::io::stderr().write_all(&buf[..n]).await;
                    }
                }
                _ => break,
            }
        }
    }

    /// SIGTERM the group, then SIGKILL it once the grace window runs out.
    async fn terminate(&self, child: &mut Child, pgid: Pid) -> Result<ExitStatus, RunError> {
        tracing::info!(pid = pgid.as_raw(), "terminating payload");
        signal_group(pgid, Signal::SIGTERM)?;

        if let Ok(status) = timeout(self.config.kill_grace, child.wait()).await {
            return Ok(status?);
        }

        tracing::warn!(
            pid = pgid.as_raw(),
            grace_ms = self.config.kill_grace.as_millis() as u64,
            "payload ignored SIGTERM, killing"
        );
        signal_group(pgid, Signal::SIGKILL)?;
        Ok(child.wait().await?)
    }
}

fn signal_group(pgid: Pid, signal: Signal) -> Result<(), RunError> {
    match killpg(pgid, signal) {
        // Group already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(RunError::Signal(e)),
    }
}

async fn spawn_with_retry(
    program: &str,
    args: &[String],
    env: &[(String, String)],
    write_end: OwnedFd,
) -> Result<Child, RunError> {
    let mut attempt = 1;
    loop {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(write_end.try_clone()?))
            .stderr(Stdio::from(write_end.try_clone()?))
            .process_group(0)
            .kill_on_drop(true);

        // `cmd` drops at the end of this iteration, closing its copies of
        // the write end; only the child keeps the pipe open.
        match cmd.spawn() {
            Ok(child) => return Ok(child),
            Err(e) if e.raw_os_error() == Some(Errno::ETXTBSY as i32) && attempt < SPAWN_ATTEMPTS => {
                attempt += 1;
                tokio::time::sleep(SPAWN_RETRY_DELAY).await;
            }
            Err(source) => {
                return Err(RunError::Spawn {
                    program: program.to_string(),
                    source,
                })
            }
        }
    }
}

/// Write `script` to an executable temp file.
pub fn materialize_script(script: &str) -> Result<TempPath, RunError> {
    let mut file = tempfile::Builder::new().prefix("fleet-").tempfile()?;
    file.write_all(script.as_bytes())?;
    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o755))?;
    // Closing the handle before exec keeps ETXTBSY to a race with other forks
    Ok(file.into_temp_path())
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
