//! Read-only inspection of BullMQ-style job queues stored in Redis.
//!
//! This crate provides:
//! - Queue discovery under a namespace
//! - Atomic per-state counts via embedded Lua scripts
//! - Job record decoding
//! - Paged, filterable job listings
//! - A fleet overview that tolerates per-queue failure
//!
//! Nothing here writes to the store.

pub mod catalog;
pub mod counter;
pub mod error;
pub mod inspector;
pub mod keys;
pub mod overview;
pub mod pagination;
pub mod reader;
pub mod scripts;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use error::{ErrorKind, QueueError, QueueResult};
pub use inspector::{InspectorConfig, QueueInspector};
pub use keys::KeySpace;
pub use pagination::JobListQuery;
pub use scripts::{ScriptName, ScriptRuntime};
pub use store::{QueueStore, RedisOptions, RedisStore, TlsMaterial};

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
