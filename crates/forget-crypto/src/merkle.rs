//! # Certificate Merkle Tree
//!
//! A binary Merkle tree over deletion certificate digests. Its root is the
//! fixed-size `certificate_root` public input of a deletion proof, so the
//! proof's shape does not grow with the number of destroyed structures.
//!
//! Hashing is domain-separated SHA-256:
//! - Leaf: `SHA256(0x00 || digest)`.
//! - Node: `SHA256(0x01 || left || right)`.
//!
//! An unpaired node at the end of a level is promoted unchanged to the next
//! level. The empty tree's root is `SHA256("")`.

use forget_core::{ContentDigest, DigestAlgorithm, Sha256Accumulator};
use serde::{Deserialize, Serialize};

fn leaf_hash(d: &ContentDigest) -> [u8; 32] {
    let mut acc = Sha256Accumulator::new();
    acc.update(&[0x00]).update(&d.bytes);
    acc.finalize().bytes
}

fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut acc = Sha256Accumulator::new();
    acc.update(&[0x01]).update(left).update(right);
    acc.finalize().bytes
}

/// Which side a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sibling is the left child.
    Left,
    /// Sibling is the right child.
    Right,
}

/// Path from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Leaf position.
    pub index: usize,
    /// The certificate digest being proven.
    pub leaf: ContentDigest,
    /// Siblings from the leaf level upward. Levels where the node was
    /// promoted without a sibling are skipped.
    pub siblings: Vec<(Side, [u8; 32])>,
}

/// Merkle tree with every level materialized.
#[derive(Debug, Clone)]
pub struct CertificateTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl CertificateTree {
    /// Build from certificate digests in order.
    pub fn build(digests: &[ContentDigest]) -> Self {
        let mut levels = vec![digests.iter().map(leaf_hash).collect::<Vec<_>>()];
        while levels.last().map_or(0, Vec::len) > 1 {
            let prev = levels.last().map(Vec::as_slice).unwrap_or_default();
            let next = prev
                .chunks(2)
                .map(|pair| match pair {
                    [l, r] => node_hash(l, r),
                    _ => pair[0],
                })
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Root digest.
    pub fn root(&self) -> ContentDigest {
        match self.levels.last().and_then(|l| l.first()) {
            Some(root) => ContentDigest::new(DigestAlgorithm::Sha256, *root),
            None => Sha256Accumulator::new().finalize(),
        }
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn inclusion_proof(&self, index: usize, leaf: ContentDigest) -> Option<InclusionProof> {
        if index >= self.leaf_count() || self.levels[0][index] != leaf_hash(&leaf) {
            return None;
        }
        let mut siblings = Vec::new();
        let mut pos = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = pos ^ 1;
            if sibling < level.len() {
                let side = if sibling < pos { Side::Left } else { Side::Right };
                siblings.push((side, level[sibling]));
            }
            pos /= 2;
        }
        Some(InclusionProof {
            index,
            leaf,
            siblings,
        })
    }
}

/// Recompute the root from an inclusion proof and compare.
pub fn verify_inclusion(proof: &InclusionProof, root: &ContentDigest) -> bool {
    let mut acc = leaf_hash(&proof.leaf);
    for (side, sibling) in &proof.siblings {
        acc = match side {
            Side::Left => node_hash(sibling, &acc),
            Side::Right => node_hash(&acc, sibling),
        };
    }
    acc == root.bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(i: u8) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        acc.update(&[i]);
        acc.finalize()
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let d = digest(1);
        let tree = CertificateTree::build(&[d]);
        assert_eq!(tree.root().bytes, leaf_hash(&d));
    }

    #[test]
    fn test_two_leaf_root() {
        let (a, b) = (digest(1), digest(2));
        let tree = CertificateTree::build(&[a, b]);
        assert_eq!(tree.root().bytes, node_hash(&leaf_hash(&a), &leaf_hash(&b)));
    }

    #[test]
    fn test_three_leaf_root_promotes_odd_node() {
        let ds = [digest(1), digest(2), digest(3)];
        let tree = CertificateTree::build(&ds);
        let left = node_hash(&leaf_hash(&ds[0]), &leaf_hash(&ds[1]));
        assert_eq!(tree.root().bytes, node_hash(&left, &leaf_hash(&ds[2])));
    }

    #[test]
    fn test_root_order_sensitive() {
        let a = CertificateTree::build(&[digest(1), digest(2)]).root();
        let b = CertificateTree::build(&[digest(2), digest(1)]).root();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_tree() {
        let tree = CertificateTree::build(&[]);
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.root(), Sha256Accumulator::new().finalize());
    }

    #[test]
    fn test_inclusion_proofs_roundtrip_for_every_leaf() {
        for n in 1..=17u8 {
            let ds: Vec<_> = (0..n).map(digest).collect();
            let tree = CertificateTree::build(&ds);
            let root = tree.root();
            for (i, d) in ds.iter().enumerate() {
                let proof = tree.inclusion_proof(i, *d).unwrap();
                assert!(verify_inclusion(&proof, &root), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn test_inclusion_proof_rejects_wrong_leaf() {
        let ds: Vec<_> = (0..5).map(digest).collect();
        let tree = CertificateTree::build(&ds);
        assert!(tree.inclusion_proof(0, digest(9)).is_none());
        let mut proof = tree.inclusion_proof(2, ds[2]).unwrap();
        proof.leaf = digest(9);
        assert!(!verify_inclusion(&proof, &tree.root()));
    }
}
