//! Building blocks for a position-monitoring bot that must not repeat work.
//!
//! - [`ExpiringRequestCache`]: remembers level-update requests for a fixed window
//!   so the monitor loop handles each one once.
//! - [`MerkleProofWorker`]: builds sorted-pair Merkle trees and extracts inclusion
//!   proofs on its own threads, answering over a channel.
//!
//! ```no_run
//! use levelguard::{CacheConfig, ExpiringRequestCache, RequestId};
//!
//! let cache = ExpiringRequestCache::new(CacheConfig::with_ttl_secs(2)?)?;
//! let request = RequestId::parse("1")?;
//! if !cache.contains(&request) {
//!     cache.add(&request);
//!     // do the expensive work
//! }
//! # Ok::<(), levelguard::Error>(())
//! ```

pub mod dedup;
pub mod error;
pub mod merkle;
pub mod request;
pub mod time;
pub mod worker;

pub use dedup::{CacheConfig, CacheConfigBuilder, ExpiringRequestCache, SweeperHandle};
pub use error::{Error, ProofError, WorkerError};
pub use merkle::{
    compute_root, verify_proof, Blake3Hasher, Hash32, Keccak256Hasher, LeafMode, MerkleProof,
    MerkleTree, NodeHasher, ProofOutcome, Sha256Hasher,
};
pub use request::RequestId;
pub use time::{ManualClock, SystemTimeProvider, TimeProvider};
pub use worker::{
    JobId, JobState, MerkleProofWorker, PendingProof, ProofRequest, ProofResponse, WorkerConfig,
    WorkerConfigBuilder,
};
