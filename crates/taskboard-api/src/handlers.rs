//! Request handlers.

pub mod health;
pub mod jobs;
pub mod queues;

pub use health::*;
pub use jobs::*;
pub use queues::*;
