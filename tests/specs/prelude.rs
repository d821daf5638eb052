//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running `fleet` against a throwaway `fleetd`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

// Aggressive timings for fast tests.
const FLEET_POLL_MS: &str = "10";
const FLEET_KILL_GRACE_MS: &str = "500";
const FLEET_RETRY_MS: &str = "50";

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where fleet and fleetd are built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn fleet_binary() -> PathBuf {
    binary_path("fleet")
}

pub fn fleetd_binary() -> PathBuf {
    binary_path("fleetd")
}

/// Create a CLI builder for fleet commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![
                ("FLEET_POLL_MS".into(), FLEET_POLL_MS.into()),
                ("FLEET_KILL_GRACE_MS".into(), FLEET_KILL_GRACE_MS.into()),
                ("FLEET_RETRY_MS".into(), FLEET_RETRY_MS.into()),
                ("NO_COLOR".into(), "1".into()),
            ],
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(fleet_binary());
        cmd.args(&self.args);
        // Keep a developer's broker out of the tests
        cmd.env_remove("FLEET_BROKER_URL");
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    pub fn stderr_lacks(self, unexpected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            !stderr.contains(unexpected),
            "stderr should not contain '{}'\nstderr: {}",
            unexpected,
            stderr
        );
        self
    }

    pub fn exit_code(self, expected: i32) -> Self {
        assert_eq!(
            self.output.status.code(),
            Some(expected),
            "unexpected exit code\nstderr: {}",
            self.stderr()
        );
        self
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Fleet
// =============================================================================

/// A throwaway broker plus the workers attached to it.
///
/// Every process is killed on drop.
pub struct Fleet {
    daemon: Child,
    url: String,
    workers: Vec<Child>,
}

impl Fleet {
    /// Start `fleetd` on a free port and wait for its READY line.
    pub fn start() -> Self {
        let mut daemon = Command::new(fleetd_binary())
            .args(["--bind", "127.0.0.1:0"])
            .env("RUST_LOG", "warn")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("fleetd should start");

        let stdout = daemon.stdout.take().expect("fleetd stdout");
        let mut line = String::new();
        BufReader::new(stdout)
            .read_line(&mut line)
            .expect("fleetd should print READY");
        let addr = line
            .trim()
            .strip_prefix("READY ")
            .unwrap_or_else(|| panic!("unexpected fleetd banner: {line:?}"))
            .to_string();

        Self {
            daemon,
            url: format!("tcp://{addr}"),
            workers: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run `fleet` against this broker.
    pub fn fleet(&self) -> CliBuilder {
        cli().env("FLEET_BROKER_URL", &self.url)
    }

    /// Start a `fleet listen` worker with `tags` and wait until it is
    /// counted on `_all_`.
    pub fn worker(&mut self, tags: &[&str]) {
        let expected = self.workers.len() + 1;
        let mut cmd = self.fleet().args(&["listen"]).command();
        if !tags.is_empty() {
            cmd.args(["--tags", &tags.join(",")]);
        }
        let child = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("fleet listen should start");
        self.workers.push(child);

        let ready = wait_for(SPEC_WAIT_MAX_MS, || self.workers_available("_all_") == expected);
        assert!(ready, "worker did not subscribe");
    }

    pub fn workers_available(&self, tag: &str) -> usize {
        let output = self
            .fleet()
            .args(&["workers", "-t", tag])
            .command()
            .output()
            .expect("fleet workers should run");
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .unwrap_or(0)
    }
}

impl Drop for Fleet {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            let _ = worker.kill();
            let _ = worker.wait();
        }
        let _ = self.daemon.kill();
        let _ = self.daemon.wait();
    }
}
