// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus channel and key naming.
//!
//! Channel names are the wire protocol between masters and slaves:
//!
//! - `fleet:control:<tag>` carries dispatch and kill orders for one tag
//! - `fleet:job:<id>:progress` carries worker acknowledgements for one job
//! - `fleet:job:<id>:num_workers` is the slot counter slaves race on

use crate::job::JobId;
use thiserror::Error;

/// Tag every slave listens on in addition to its own tags.
pub const ALL_TAG: &str = "_all_";

/// Permanent channel the master listener holds so that job channels can be
/// added and removed on a single subscription.
pub const DUMMY_PROGRESS_CHANNEL: &str = "fleet:job:dummy";

const CONTROL_PREFIX: &str = "fleet:control:";
const JOB_PREFIX: &str = "fleet:job:";
const PROGRESS_SUFFIX: &str = ":progress";

/// Delimiter used when tags are joined into lists.
pub const TAG_DELIMITER: char = ',';

/// Errors from tag validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("tag must not be empty")]
    Empty,
    #[error("cannot have multi tags: {0:?}")]
    MultipleTags(String),
}

/// Validate a single dispatch tag.
pub fn validate_tag(tag: &str) -> Result<(), TagError> {
    if tag.is_empty() {
        return Err(TagError::Empty);
    }
    if tag.contains(TAG_DELIMITER) {
        return Err(TagError::MultipleTags(tag.to_string()));
    }
    Ok(())
}

/// Split a comma-joined tag list, dropping blanks.
pub fn parse_tag_list(list: &str) -> Vec<String> {
    list.split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn control_channel(tag: &str) -> String {
    format!("{CONTROL_PREFIX}{tag}")
}

pub fn all_control_channel() -> String {
    control_channel(ALL_TAG)
}

pub fn progress_channel(id: &JobId) -> String {
    format!("{JOB_PREFIX}{id}{PROGRESS_SUFFIX}")
}

pub fn worker_counter_key(id: &JobId) -> String {
    format!("{JOB_PREFIX}{id}:num_workers")
}

/// Resolve the job id a progress channel belongs to.
///
/// Returns `None` for anything that is not a job progress channel,
/// including [`DUMMY_PROGRESS_CHANNEL`].
pub fn job_id_from_progress_channel(channel: &str) -> Option<JobId> {
    let id = channel
        .strip_prefix(JOB_PREFIX)?
        .strip_suffix(PROGRESS_SUFFIX)?;
    if id.is_empty() {
        return None;
    }
    Some(JobId::new(id))
}

/// Control channels a slave with `tags` subscribes to (its tags plus `_all_`).
pub fn slave_channels(tags: &[String]) -> Vec<String> {
    let mut channels: Vec<String> = tags
        .iter()
        .filter(|t| t.as_str() != ALL_TAG)
        .map(|t| control_channel(t))
        .collect();
    channels.push(all_control_channel());
    channels
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
