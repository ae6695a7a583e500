use std::fmt;
use std::sync::Arc;

use crate::error::ProofError;
use crate::merkle::hasher::NodeHasher;
use crate::merkle::types::{Hash32, LeafMode, MerkleProof, ProofOutcome};

/// Canonical binary Merkle tree with sorted-pair node hashing.
///
/// The bottom layer is the sorted, deduplicated set of leaf nodes, so the root
/// depends only on the leaf *set*. An unpaired last node is promoted to the next
/// layer unchanged.
pub struct MerkleTree {
    /// `layers[0]` is the leaf layer, the last layer holds only the root.
    layers: Vec<Vec<Hash32>>,
    hasher: Arc<dyn NodeHasher>,
    mode: LeafMode,
}

impl MerkleTree {
    pub fn build(
        leaves: &[Hash32],
        hasher: Arc<dyn NodeHasher>,
        mode: LeafMode,
    ) -> Result<Self, ProofError> {
        let layers = build_layers(leaves, hasher.as_ref(), mode)?;
        Ok(Self {
            layers,
            hasher,
            mode,
        })
    }

    pub fn root(&self) -> Hash32 {
        // build_layers never yields an empty top layer
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_default()
    }

    /// Number of distinct leaves.
    pub fn len(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of hashing levels above the leaf layer.
    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    pub fn leaf_mode(&self) -> LeafMode {
        self.mode
    }

    pub fn contains(&self, leaf: &Hash32) -> bool {
        self.position(leaf).is_some()
    }

    pub fn proof(&self, leaf: &Hash32) -> ProofOutcome {
        let Some(mut index) = self.position(leaf) else {
            return ProofOutcome::NotFound { leaf: *leaf };
        };
        let mut siblings = Vec::with_capacity(self.depth());
        for layer in &self.layers[..self.depth()] {
            if let Some(sibling) = layer.get(index ^ 1) {
                siblings.push(*sibling);
            }
            index /= 2;
        }
        ProofOutcome::Found(MerkleProof {
            leaf: *leaf,
            root: self.root(),
            siblings,
        })
    }

    pub fn verify(&self, proof: &MerkleProof) -> bool {
        proof.root == self.root()
            && verify_proof(
                &proof.root,
                &proof.leaf,
                &proof.siblings,
                self.hasher.as_ref(),
                self.mode,
            )
    }

    fn position(&self, leaf: &Hash32) -> Option<usize> {
        let node = self.mode.leaf_node(leaf, self.hasher.as_ref());
        self.layers.first()?.binary_search(&node).ok()
    }
}

impl fmt::Debug for MerkleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("root", &self.root())
            .field("leaves", &self.len())
            .field("depth", &self.depth())
            .field("hasher", &self.hasher)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Root of the canonical tree over `leaves` without keeping the layers.
pub fn compute_root(
    leaves: &[Hash32],
    hasher: &dyn NodeHasher,
    mode: LeafMode,
) -> Result<Hash32, ProofError> {
    let mut level = leaf_layer(leaves, hasher, mode)?;
    while level.len() > 1 {
        level = next_layer(&level, hasher);
    }
    Ok(level[0])
}

/// Fold `leaf` with `siblings` under sorted-pair hashing and compare to `root`.
pub fn verify_proof(
    root: &Hash32,
    leaf: &Hash32,
    siblings: &[Hash32],
    hasher: &dyn NodeHasher,
    mode: LeafMode,
) -> bool {
    let computed = siblings
        .iter()
        .fold(mode.leaf_node(leaf, hasher), |node, sibling| {
            hasher.hash_pair(&node, sibling)
        });
    computed == *root
}

fn leaf_layer(
    leaves: &[Hash32],
    hasher: &dyn NodeHasher,
    mode: LeafMode,
) -> Result<Vec<Hash32>, ProofError> {
    if leaves.is_empty() {
        return Err(ProofError::EmptyLeafSet);
    }
    let mut layer: Vec<Hash32> = leaves
        .iter()
        .map(|leaf| mode.leaf_node(leaf, hasher))
        .collect();
    layer.sort_unstable();
    layer.dedup();
    Ok(layer)
}

fn next_layer(layer: &[Hash32], hasher: &dyn NodeHasher) -> Vec<Hash32> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => hasher.hash_pair(a, b),
            [odd] => *odd,
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}

fn build_layers(
    leaves: &[Hash32],
    hasher: &dyn NodeHasher,
    mode: LeafMode,
) -> Result<Vec<Vec<Hash32>>, ProofError> {
    let mut layers = vec![leaf_layer(leaves, hasher, mode)?];
    while let Some(top) = layers.last().filter(|top| top.len() > 1) {
        let next = next_layer(top, hasher);
        layers.push(next);
    }
    Ok(layers)
}
