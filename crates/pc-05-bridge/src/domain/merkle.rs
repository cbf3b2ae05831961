//! Merkle branch proofs over external block transactions.
//!
//! Interior nodes are `double_sha256(left || right)`; an odd node at any
//! level is paired with itself.

use serde::{Deserialize, Serialize};
use shared_crypto::double_sha256;
use shared_types::Hash;

/// Deepest branch accepted.
pub const MAX_MERKLE_DEPTH: usize = 32;

/// Sibling hashes from a leaf up to the root.
///
/// Bit `i` of `path` is set when the node at level `i` is a right child.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MerkleBranch {
    /// Siblings, leaf level first
    pub hashes: Vec<Hash>,
    /// Left/right position bits
    pub path: u64,
}

impl MerkleBranch {
    /// Whether the branch is within the depth bound and its path uses no
    /// bits above its depth.
    pub fn is_well_formed(&self) -> bool {
        self.hashes.len() <= MAX_MERKLE_DEPTH && self.path >> self.hashes.len() == 0
    }

    /// Root this branch proves for `leaf`.
    pub fn root_for(&self, leaf: &Hash) -> Hash {
        self.hashes
            .iter()
            .enumerate()
            .fold(*leaf, |node, (level, sibling)| {
                if self.path >> level & 1 == 1 {
                    combine(sibling, &node)
                } else {
                    combine(&node, sibling)
                }
            })
    }

    /// Branch for `leaves[index]`.
    pub fn build(leaves: &[Hash], index: usize) -> Option<Self> {
        if index >= leaves.len() {
            return None;
        }
        let mut level = leaves.to_vec();
        let mut position = index;
        let mut branch = Self {
            hashes: Vec::new(),
            path: 0,
        };
        while level.len() > 1 {
            let sibling = if position % 2 == 1 {
                branch.path |= 1 << branch.hashes.len();
                level[position - 1]
            } else {
                *level.get(position + 1).unwrap_or(&level[position])
            };
            branch.hashes.push(sibling);
            level = next_level(&level);
            position /= 2;
        }
        Some(branch)
    }
}

/// Merkle root of `leaves`; all zeroes for an empty block.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| combine(&pair[0], pair.get(1).unwrap_or(&pair[0])))
        .collect()
}

fn combine(left: &Hash, right: &Hash) -> Hash {
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(left);
    bytes[32..].copy_from_slice(right);
    double_sha256(&bytes)
}
