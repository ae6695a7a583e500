use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::worker::protocol::JobId;

/// Configuration and argument errors raised while constructing crate types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
}

/// Failure of a single proof job. Sent back over the worker channel, so it is
/// serializable and never takes the worker down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProofError {
    #[error("cannot build a merkle tree from an empty leaf set")]
    EmptyLeafSet,
    #[error("malformed leaf: {0}")]
    MalformedLeaf(String),
    #[error("malformed proof request: {0}")]
    MalformedRequest(String),
}

/// Errors seen by a caller of [`crate::MerkleProofWorker`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("proof job failed: {0}")]
    Job(#[from] ProofError),
    #[error("proof worker channel closed")]
    Disconnected,
    #[error("proof worker did not respond within {0:?}")]
    Timeout(Duration),
    #[error("proof worker queue is full")]
    QueueFull,
    #[error("response for job {got} delivered to job {expected}")]
    CorrelationMismatch { expected: JobId, got: JobId },
}

impl WorkerError {
    /// Whether the worker should be restarted before submitting more jobs.
    pub fn requires_restart(&self) -> bool {
        matches!(self, WorkerError::Disconnected | WorkerError::Timeout(_))
    }
}
