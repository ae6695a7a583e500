use std::fmt::Debug;

use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::merkle::types::Hash32;

/// 32-byte hash used for leaves and internal nodes.
pub trait NodeHasher: Send + Sync + Debug {
    fn hash(&self, data: &[u8]) -> Hash32;

    /// Sorted-pair combination: `H(min(a, b) || max(a, b))`.
    ///
    /// Order-independent, so proofs need no left/right markers.
    fn hash_pair(&self, a: &Hash32, b: &Hash32) -> Hash32 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(lo.as_bytes());
        buf[32..].copy_from_slice(hi.as_bytes());
        self.hash(&buf)
    }
}

/// Keccak-256, the hash EVM verifiers use.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl NodeHasher for Keccak256Hasher {
    fn hash(&self, data: &[u8]) -> Hash32 {
        Hash32(Keccak256::digest(data).into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl NodeHasher for Sha256Hasher {
    fn hash(&self, data: &[u8]) -> Hash32 {
        Hash32(Sha256::digest(data).into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl NodeHasher for Blake3Hasher {
    fn hash(&self, data: &[u8]) -> Hash32 {
        Hash32(blake3::hash(data).into())
    }
}
