//! Key-space layout shared with the producing queue library.
//!
//! ```text
//! <namespace>:<queue>:<state>   per-state index (sorted set)
//! <namespace>:<queue>:<jobId>   per-job hash
//! ```

use taskboard_models::{JobId, JobState, QueueName};

/// Namespace used by the producing library when none is configured.
pub const DEFAULT_NAMESPACE: &str = "bull";

/// Key delimiter.
pub const SEPARATOR: char = ':';

/// Builds store keys under one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// `namespace` is the bare name (`bull`); an empty name falls back to the default.
    pub fn new(namespace: &str) -> Self {
        let namespace = namespace.trim_end_matches(SEPARATOR);
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        Self {
            prefix: format!("{namespace}{SEPARATOR}"),
        }
    }

    /// Prefix including the trailing separator, e.g. `bull:`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Pattern matching every key in the namespace.
    pub fn discovery_pattern(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Base key of a queue, e.g. `bull:mail`.
    pub fn queue_key(&self, queue: &QueueName) -> String {
        format!("{}{}", self.prefix, queue)
    }

    pub fn state_key(&self, queue: &QueueName, state: JobState) -> String {
        format!("{}{SEPARATOR}{}", self.queue_key(queue), state.index_suffix())
    }

    pub fn job_key(&self, queue: &QueueName, id: &JobId) -> String {
        format!("{}{SEPARATOR}{}", self.queue_key(queue), id)
    }

    /// Extract the queue segment from a raw key in this namespace.
    ///
    /// Returns `None` for keys outside the namespace or with an empty queue segment.
    pub fn queue_of<'a>(&self, raw_key: &'a str) -> Option<&'a str> {
        let rest = raw_key.strip_prefix(self.prefix.as_str())?;
        let queue = rest.split(SEPARATOR).next()?;
        (!queue.is_empty()).then_some(queue)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
