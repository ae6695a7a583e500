//! Sorted-pair Merkle trees and inclusion proofs.
//!
//! Internal nodes hash their children in ascending byte order, which makes the
//! root a function of the leaf set alone and lets a proof be a bare list of
//! sibling hashes. On-chain verifiers must apply the same rule.

pub mod hasher;
pub mod tree;
pub mod types;

pub use hasher::{Blake3Hasher, Keccak256Hasher, NodeHasher, Sha256Hasher};
pub use tree::{compute_root, verify_proof, MerkleTree};
pub use types::{Hash32, LeafMode, MerkleProof, ProofOutcome};
