//! Validation errors for model types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid job id: {0:?}")]
    InvalidJobId(String),

    #[error("Unknown job state: {0:?}")]
    InvalidState(String),

    #[error("Invalid queue name: {0:?}")]
    InvalidQueueName(String),
}
