//! Shared data models for the taskboard queue inspector.
//!
//! This crate provides Serde-serializable types for:
//! - Queue names and per-state job counts
//! - Job ids and lifecycle states
//! - Decoded job records and job pages

pub mod error;
pub mod job;
pub mod queue;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use job::{DecodedJobRecord, JobId, JobPage, JobState};
pub use queue::{JobCounts, OverviewSnapshot, QueueName};
