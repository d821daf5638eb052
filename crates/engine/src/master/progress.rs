// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress board: one status line per tracked job.
//!
//! In live mode the board redraws its lines in place. Lines of jobs that
//! leave the registry are committed: they stay on screen above the region
//! that is redrawn. Jobs always leave from the front, so committed lines
//! keep registry order.

use crate::env;
use fleet_core::{Job, JobId, JobStatus};
use std::collections::HashMap;
use std::io::{IsTerminal, Write};

const RESET: &str = "\x1b[0m";
const CLEAR_LINE: &str = "\x1b[2K";

/// How the board writes to its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardStyle {
    /// Redraw in place with ANSI cursor movement
    Live { color: bool },
    /// Append a line whenever a job changes status
    Log,
    /// Draw nothing
    Off,
}

impl BoardStyle {
    /// Live on a terminal, log lines otherwise.
    ///
    /// Color priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
    pub fn detect() -> Self {
        let tty = std::io::stderr().is_terminal();
        let color = if env::no_color() {
            false
        } else {
            env::force_color() || tty
        };
        if tty {
            BoardStyle::Live { color }
        } else {
            BoardStyle::Log
        }
    }
}

pub struct ProgressBoard {
    out: Box<dyn Write + Send>,
    style: BoardStyle,
    /// Lines currently in the redraw region
    drawn: usize,
    /// Last status printed per job in log mode
    announced: HashMap<JobId, JobStatus>,
}

impl ProgressBoard {
    pub fn new(out: Box<dyn Write + Send>, style: BoardStyle) -> Self {
        Self {
            out,
            style,
            drawn: 0,
            announced: HashMap::new(),
        }
    }

    /// Board on stderr, styled for the current environment.
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()), BoardStyle::detect())
    }

    pub fn off() -> Self {
        Self::new(Box::new(std::io::sink()), BoardStyle::Off)
    }

    pub fn style(&self) -> BoardStyle {
        self.style
    }

    /// Draw the current state of `jobs`, in order.
    pub fn render<'a>(&mut self, jobs: impl IntoIterator<Item = &'a Job>) {
        let result = match self.style {
            BoardStyle::Off => Ok(()),
            BoardStyle::Live { color } => self.draw_live(jobs, color),
            BoardStyle::Log => self.draw_log(jobs),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "progress render failed");
        }
    }

    /// Jobs dropped from the front of the registry keep their last line.
    pub fn commit(&mut self, ids: &[JobId]) {
        self.drawn = self.drawn.saturating_sub(ids.len());
        for id in ids {
            self.announced.remove(id);
        }
    }

    fn draw_live<'a>(
        &mut self,
        jobs: impl IntoIterator<Item = &'a Job>,
        color: bool,
    ) -> std::io::Result<()> {
        let mut frame = String::new();
        if self.drawn > 0 {
            frame.push_str(&format!("\x1b[{}A", self.drawn));
        }
        let mut lines = 0;
        for job in jobs {
            frame.push_str(CLEAR_LINE);
            if color {
                frame.push_str(status_color(job.status));
                frame.push_str(&status_line(job));
                frame.push_str(RESET);
            } else {
                frame.push_str(&status_line(job));
            }
            frame.push('\n');
            lines += 1;
        }
        self.drawn = lines;
        self.out.write_all(frame.as_bytes())?;
        self.out.flush()
    }

    fn draw_log<'a>(&mut self, jobs: impl IntoIterator<Item = &'a Job>) -> std::io::Result<()> {
        for job in jobs {
            if self.announced.get(&job.id) == Some(&job.status) {
                continue;
            }
            self.announced.insert(job.id.clone(), job.status);
            writeln!(self.out, "{}", status_line(job))?;
        }
        self.out.flush()
    }
}

/// Plain status line for one job.
pub fn status_line(job: &Job) -> String {
    let label = match job.status {
        JobStatus::Idle => "waiting".to_string(),
        JobStatus::Started | JobStatus::Running => {
            let (done, total) = job.progress().unwrap_or((0, job.num_workers));
            format!("{} {done}/{total}", job.status)
        }
        JobStatus::Success => "done".to_string(),
        JobStatus::Failed => "FAILED".to_string(),
        JobStatus::Killed => "killed".to_string(),
    };
    format!("==> {} [{}] {label}", job.name, job.tag)
}

fn status_color(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Success => "\x1b[1;32m",
        JobStatus::Failed => "\x1b[1;31m",
        JobStatus::Killed => "\x1b[1;35m",
        JobStatus::Idle | JobStatus::Started | JobStatus::Running => "\x1b[1;33m",
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
