use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProofError;
use crate::merkle::hasher::NodeHasher;

/// Fixed-width 32-byte hash. Orders as a big-endian unsigned integer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse 64 hex digits, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, ProofError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| ProofError::MalformedLeaf(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Hash32 {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Hash32 {
    type Error = ProofError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Hash32> for String {
    fn from(hash: Hash32) -> Self {
        hash.to_hex()
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// How a supplied leaf becomes a node of the bottom layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafMode {
    /// Leaves are already hashes and are used as-is.
    #[default]
    Prehashed,
    /// Each leaf is hashed once more before entering the tree.
    Rehash,
}

impl LeafMode {
    pub fn leaf_node(self, leaf: &Hash32, hasher: &dyn NodeHasher) -> Hash32 {
        match self {
            LeafMode::Prehashed => *leaf,
            LeafMode::Rehash => hasher.hash(leaf.as_bytes()),
        }
    }
}

/// Inclusion proof: sibling hashes from the leaf layer up to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Hash32,
    pub root: Hash32,
    pub siblings: Vec<Hash32>,
}

impl MerkleProof {
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    /// True only for the proof of a single-leaf tree.
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    pub fn verify(&self, hasher: &dyn NodeHasher, mode: LeafMode) -> bool {
        crate::merkle::tree::verify_proof(&self.root, &self.leaf, &self.siblings, hasher, mode)
    }
}

/// Result of a proof lookup. `NotFound` is an ordinary outcome, distinct from the
/// empty proof of a single-leaf tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProofOutcome {
    Found(MerkleProof),
    NotFound { leaf: Hash32 },
}

impl ProofOutcome {
    pub fn found(&self) -> bool {
        matches!(self, ProofOutcome::Found(_))
    }

    pub fn proof(&self) -> Option<&MerkleProof> {
        match self {
            ProofOutcome::Found(proof) => Some(proof),
            ProofOutcome::NotFound { .. } => None,
        }
    }

    pub fn into_proof(self) -> Option<MerkleProof> {
        match self {
            ProofOutcome::Found(proof) => Some(proof),
            ProofOutcome::NotFound { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_and_prefix_is_optional() {
        let hash = Hash32([0xab; 32]);
        let text = hash.to_hex();
        assert_eq!(text.len(), 66);
        assert_eq!(Hash32::from_hex(&text).expect("prefixed"), hash);
        assert_eq!(Hash32::from_hex(&text[2..]).expect("bare"), hash);
    }

    #[test]
    fn wrong_width_is_malformed() {
        let err = Hash32::from_hex("0x1234").expect_err("too short");
        assert!(matches!(err, ProofError::MalformedLeaf(_)));
        assert!(Hash32::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn orders_as_big_endian_integer() {
        let mut low = [0u8; 32];
        low[31] = 0xff;
        let mut high = [0u8; 32];
        high[0] = 0x01;
        assert!(Hash32(low) < Hash32(high));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let leaf = Hash32([1; 32]);
        let not_found = serde_json::to_value(ProofOutcome::NotFound { leaf }).expect("json");
        assert_eq!(not_found["status"], "not_found");
        assert_eq!(not_found["leaf"], leaf.to_hex());

        let found = ProofOutcome::Found(MerkleProof {
            leaf,
            root: leaf,
            siblings: Vec::new(),
        });
        let json = serde_json::to_string(&found).expect("json");
        let back: ProofOutcome = serde_json::from_str(&json).expect("parse");
        assert!(back.found());
        assert!(back.proof().is_some_and(MerkleProof::is_empty));
    }
}
