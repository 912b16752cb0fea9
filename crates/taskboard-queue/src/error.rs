//! Queue inspection error types.

use std::time::Duration;

use taskboard_models::ModelError;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Script bundle invalid: {0}")]
    ScriptBundle(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store call {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Unexpected reply from {operation}: {detail}")]
    UnexpectedReply {
        operation: &'static str,
        detail: String,
    },

    #[error("Job not found: {queue}/{id}")]
    JobNotFound { queue: String, id: String },

    #[error(transparent)]
    InvalidInput(#[from] ModelError),

    #[error("Job {id} has undecodable {field}: {reason}")]
    Decode {
        id: String,
        field: &'static str,
        reason: String,
    },
}

/// Coarse classification used to pick a response at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The engine cannot start serving
    StartupFatal,
    /// A store call failed or timed out
    Store,
    /// The requested resource does not exist
    NotFound,
    /// The request was rejected before touching the store
    InvalidInput,
    /// A stored record could not be decoded
    Decode,
}

impl QueueError {
    pub fn script_bundle(msg: impl Into<String>) -> Self {
        Self::ScriptBundle(msg.into())
    }

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn unexpected_reply(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            operation,
            detail: detail.into(),
        }
    }

    pub fn decode(id: impl Into<String>, field: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            id: id.into(),
            field,
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::ScriptBundle(_) | QueueError::ConnectionFailed(_) => ErrorKind::StartupFatal,
            QueueError::Redis(_) | QueueError::Timeout { .. } | QueueError::UnexpectedReply { .. } => {
                ErrorKind::Store
            }
            QueueError::JobNotFound { .. } => ErrorKind::NotFound,
            QueueError::InvalidInput(_) => ErrorKind::InvalidInput,
            QueueError::Decode { .. } => ErrorKind::Decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let invalid: QueueError = ModelError::InvalidJobId("x".into()).into();
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);

        let missing = QueueError::JobNotFound {
            queue: "mail".into(),
            id: "1".into(),
        };
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.to_string(), "Job not found: mail/1");

        let timeout = QueueError::Timeout {
            operation: "hgetall",
            after: Duration::from_millis(5),
        };
        assert_eq!(timeout.kind(), ErrorKind::Store);

        assert_eq!(QueueError::decode("7", "data", "eof").kind(), ErrorKind::Decode);
        assert_eq!(QueueError::script_bundle("empty").kind(), ErrorKind::StartupFatal);
    }
}
