//! Off-thread Merkle proof computation.
//!
//! Callers hand a [`ProofRequest`] to a [`MerkleProofWorker`] and await the
//! [`ProofOutcome`](crate::merkle::ProofOutcome) without hashing on their own
//! thread. Failures come back as [`WorkerError`](crate::error::WorkerError):
//! job failures as `Job`, a dead or closed worker as `Disconnected`, a stalled one
//! as `Timeout`.

pub mod config;
pub mod engine;
pub mod protocol;

pub use config::{WorkerConfig, WorkerConfigBuilder};
pub use engine::{MerkleProofWorker, PendingProof};
pub use protocol::{JobId, JobState, ProofRequest, ProofResponse};
