//! Job identifiers, lifecycle states and decoded job records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};
use crate::queue::QueueName;

/// Identifier of a job inside one queue.
///
/// The producing library allocates ids from a per-queue counter, so a
/// well-formed id is one or more ASCII decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Validate and wrap a raw id.
    pub fn parse(raw: impl Into<String>) -> ModelResult<Self> {
        let raw = raw.into();
        if Self::is_well_formed(&raw) {
            Ok(Self(raw))
        } else {
            Err(ModelError::InvalidJobId(raw))
        }
    }

    /// Returns true if `raw` is a non-empty run of decimal digits.
    pub fn is_well_formed(raw: &str) -> bool {
        !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for JobId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

/// Lifecycle state of a job.
///
/// The declaration order is the canonical order used when counting states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Job is being processed by a worker
    Active,
    /// Job is queued and ready to be picked up
    Waiting,
    /// Job is scheduled to become ready later
    Delayed,
    /// Job finished successfully
    Completed,
    /// Job finished with an error
    Failed,
}

impl JobState {
    /// All states in canonical order.
    pub const ALL: [JobState; 5] = [
        JobState::Active,
        JobState::Waiting,
        JobState::Delayed,
        JobState::Completed,
        JobState::Failed,
    ];

    /// Public name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Active => "active",
            JobState::Waiting => "waiting",
            JobState::Delayed => "delayed",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Suffix of the per-state index key in the store.
    ///
    /// The producing library keeps waiting jobs under `wait`, every other
    /// state under its own name.
    pub fn index_suffix(&self) -> &'static str {
        match self {
            JobState::Waiting => "wait",
            other => other.as_str(),
        }
    }

    /// Resolve a state from its index key suffix.
    pub fn from_index_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.index_suffix() == suffix)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = ModelError;

    /// Accepts both the public name and the index suffix (`waiting` / `wait`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s || state.index_suffix() == s)
            .ok_or_else(|| ModelError::InvalidState(s.to_string()))
    }
}

/// A stored job hash with its JSON fields parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedJobRecord {
    /// Job id
    pub id: JobId,
    /// Queue the job belongs to
    pub queue: QueueName,
    /// Job name given by the producer
    pub name: String,
    /// Payload
    pub data: serde_json::Value,
    /// Job options as written by the producer
    #[serde(rename = "options")]
    pub opts: serde_json::Value,
    /// Stack trace lines (empty unless the job failed)
    pub stacktrace: Vec<String>,
    /// Return value of a completed job
    pub returnvalue: serde_json::Value,
    /// Failure message of a failed job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    /// Creation time (ms since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Time a worker picked the job up (ms since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_on: Option<i64>,
    /// Time the job completed or failed (ms since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_on: Option<i64>,
    pub attempts_made: i64,
    pub priority: i64,
    pub delay: i64,
}

/// One page of decoded jobs for a (queue, state) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPage {
    /// Jobs on this page, newest first
    pub jobs: Vec<DecodedJobRecord>,
    /// Size of the whole state index, independent of the page
    pub total: u64,
    /// Offset the page starts at
    pub start: u64,
    /// Exclusive end offset actually read, after defaulting and clamping
    pub stop: u64,
}
