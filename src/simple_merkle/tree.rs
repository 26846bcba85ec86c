//! The namespace-agnostic Merkle engine: a flat, left-perfect binary tree
//! over a `Vec` of leaf hashes, and the range-proof build/check logic that
//! works purely in terms of leaf positions.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::db::Db;
use super::error::RangeProofError;
use super::proof::Proof;
use super::utils::{compute_num_left_siblings, left_subtree_size};

/// A hash function suitable for building a Merkle tree: produces a leaf
/// digest, combines two digests into their parent's, and has a digest for
/// the empty tree.
///
/// `Default` is a supertrait so that a throwaway tree can be built purely
/// from its type (`MerkleTree::<NoopDb, M>::new()`) when verifying a
/// standalone [`Proof`], without needing a configured hasher instance.
pub trait MerkleHash: Default + Clone {
    /// The digest type this hasher produces.
    type Output: Clone + PartialEq + Eq + core::fmt::Debug;
    /// What can go wrong hashing a leaf or combining two nodes.
    type Error;

    /// The digest of an empty tree.
    fn empty_root(&self) -> Self::Output;

    /// Hash a single leaf's bytes.
    fn hash_leaf(&self, leaf: &[u8]) -> Result<Self::Output, Self::Error>;

    /// Combine two (already ordered) sibling digests into their parent's.
    fn hash_nodes(&self, left: &Self::Output, right: &Self::Output) -> Result<Self::Output, Self::Error>;
}

/// An ordered, append-only Merkle tree over leaf hashes produced by `M`,
/// optionally persisting through `D`.
#[derive(Clone, Debug)]
pub struct MerkleTree<D, M: MerkleHash> {
    hasher: M,
    leaves: Vec<Vec<u8>>,
    leaf_hashes: Vec<M::Output>,
    db: D,
}

impl<D, M> MerkleTree<D, M>
where
    D: Db<M::Output> + Default,
    M: MerkleHash,
{
    /// Build an empty tree with a default-constructed hasher.
    pub fn new() -> Self {
        Self::with_hasher(M::default())
    }

    /// Build an empty tree using the given hasher.
    pub fn with_hasher(hasher: M) -> Self {
        Self {
            hasher,
            leaves: Vec::new(),
            leaf_hashes: Vec::new(),
            db: D::default(),
        }
    }
}

impl<D, M> Default for MerkleTree<D, M>
where
    D: Db<M::Output> + Default,
    M: MerkleHash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D, M> MerkleTree<D, M>
where
    D: Db<M::Output>,
    M: MerkleHash,
{
    /// The hasher this tree was built with.
    pub fn hasher(&self) -> &M {
        &self.hasher
    }

    /// Number of leaves pushed so far.
    pub fn len(&self) -> usize {
        self.leaf_hashes.len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaf_hashes.is_empty()
    }

    /// The raw bytes of every leaf pushed so far, in order.
    pub fn leaves(&self) -> &[Vec<u8>] {
        &self.leaves
    }

    /// The raw bytes of the leaf at `index`, if any.
    pub fn leaf(&self, index: usize) -> Option<&[u8]> {
        self.leaves.get(index).map(Vec::as_slice)
    }

    /// The digest of the leaf at `index`, if any.
    pub fn leaf_hash(&self, index: usize) -> Option<&M::Output> {
        self.leaf_hashes.get(index)
    }

    /// Hash and append a leaf. Callers that need ordering/format invariants
    /// beyond "hashes successfully" (namespace ordering, for instance) must
    /// enforce them before calling this.
    pub fn push_leaf(&mut self, leaf: Vec<u8>) -> Result<(), M::Error> {
        let hash = self.hasher.hash_leaf(&leaf)?;
        self.db.put_leaf(self.leaves.len(), &leaf);
        self.leaves.push(leaf);
        self.leaf_hashes.push(hash);
        Ok(())
    }

    /// The tree's root digest.
    ///
    /// Combining already-pushed leaves can only fail if a caller bypassed
    /// `push_leaf`'s ordering invariant, which would be a bug in this
    /// crate's own callers, not a condition to recover from here.
    pub fn root(&self) -> M::Output {
        if self.leaf_hashes.is_empty() {
            self.hasher.empty_root()
        } else {
            self.compute_root_of_range(&self.leaf_hashes)
                .unwrap_or_else(|_| unreachable!("tree leaves are combined in push order"))
        }
    }

    /// Recompute the canonical-split root over an arbitrary slice of
    /// already-ordered digests. Used both for the whole tree's `root()` and,
    /// recursively, for any canonically-aligned sub-range of it.
    fn compute_root_of_range(&self, items: &[M::Output]) -> Result<M::Output, M::Error> {
        match items.len() {
            0 => Ok(self.hasher.empty_root()),
            1 => Ok(items[0].clone()),
            m => {
                let k = left_subtree_size(m);
                let (left, right) = items.split_at(k);
                let left_root = self.compute_root_of_range(left)?;
                let right_root = self.compute_root_of_range(right)?;
                self.hasher.hash_nodes(&left_root, &right_root)
            }
        }
    }

    /// Build a range proof for the leaves `[start, end)`.
    pub fn build_range_proof(&self, start: usize, end: usize) -> Result<Proof<M>, RangeProofError>
    where
        M::Error: Into<RangeProofError>,
    {
        let len = self.leaf_hashes.len();
        if start > end || end > len {
            return Err(RangeProofError::RangeOutOfBounds { start, end, len });
        }
        if len == 0 {
            return Err(RangeProofError::TreeIsEmpty);
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        if start < end {
            self.collect_siblings(0, len, start, end, &mut left, &mut right)
                .map_err(Into::into)?;
        }
        let mut siblings = left;
        siblings.extend(right);

        Ok(Proof {
            siblings,
            start: start as u32,
            end: end as u32,
        })
    }

    /// Recursively walk the real tree's `(node_start, node_end)` subtree,
    /// pushing the digest of any maximal block fully outside `[start, end)`
    /// into `left`/`right`, and returning this subtree's own digest (needed
    /// by the caller to combine into its parent's).
    fn collect_siblings(
        &self,
        node_start: usize,
        node_end: usize,
        start: usize,
        end: usize,
        left: &mut Vec<M::Output>,
        right: &mut Vec<M::Output>,
    ) -> Result<M::Output, M::Error> {
        if node_end <= start || node_start >= end {
            let digest = self.compute_root_of_range(&self.leaf_hashes[node_start..node_end])?;
            if node_end <= start {
                left.push(digest.clone());
            } else {
                right.push(digest.clone());
            }
            Ok(digest)
        } else if node_start >= start && node_end <= end {
            self.compute_root_of_range(&self.leaf_hashes[node_start..node_end])
        } else {
            let k = left_subtree_size(node_end - node_start);
            let mid = node_start + k;
            let left_root = self.collect_siblings(node_start, mid, start, end, left, right)?;
            let right_root = self.collect_siblings(mid, node_end, start, end, left, right)?;
            self.hasher.hash_nodes(&left_root, &right_root)
        }
    }

    /// Recompute the root implied by `leaf_hashes` (the claimed contents of
    /// `[start_idx, start_idx + leaf_hashes.len())`) plus `siblings`, and
    /// check it against `root`.
    ///
    /// `siblings` is consumed (front to back) but is itself a caller-owned
    /// container of borrowed digests — the proof's own sibling list is never
    /// mutated by verification.
    pub fn check_range_proof(
        &self,
        root: &M::Output,
        leaf_hashes: &[M::Output],
        siblings: &mut VecDeque<&M::Output>,
        start_idx: usize,
    ) -> Result<(), RangeProofError>
    where
        M::Error: Into<RangeProofError>,
    {
        if leaf_hashes.is_empty() {
            return Err(RangeProofError::NoLeavesProvided);
        }

        let num_left_siblings = compute_num_left_siblings(start_idx);
        if siblings.len() < num_left_siblings {
            return Err(RangeProofError::MalformedProof);
        }

        let mut items = Vec::with_capacity(siblings.len() + leaf_hashes.len());
        for _ in 0..num_left_siblings {
            let sibling = siblings.pop_front().ok_or(RangeProofError::MalformedProof)?;
            items.push(sibling.clone());
        }
        items.extend(leaf_hashes.iter().cloned());
        while let Some(sibling) = siblings.pop_front() {
            items.push(sibling.clone());
        }

        let computed = self.compute_root_of_range(&items).map_err(Into::into)?;
        if &computed != root {
            return Err(RangeProofError::RootMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaced_hash::{NamespaceId, NamespacedSha2Hasher};
    use crate::simple_merkle::db::NoopDb;

    fn tree_of(nids: &[u8]) -> MerkleTree<NoopDb, NamespacedSha2Hasher<1>> {
        let mut tree = MerkleTree::with_hasher(NamespacedSha2Hasher::new(false));
        for (i, nid) in nids.iter().enumerate() {
            let mut leaf = alloc::vec![*nid];
            leaf.push(i as u8);
            tree.push_leaf(leaf).unwrap();
        }
        tree
    }

    #[test]
    fn empty_tree_root_is_empty_digest() {
        let tree: MerkleTree<NoopDb, NamespacedSha2Hasher<1>> =
            MerkleTree::with_hasher(NamespacedSha2Hasher::new(false));
        assert_eq!(tree.root(), NamespacedSha2Hasher::<1>::new(false).empty_root());
    }

    #[test]
    fn range_proof_round_trips_for_every_contiguous_range() {
        let tree = tree_of(&[0, 0, 1, 1, 2]);
        let root = tree.root();
        for start in 0..tree.len() {
            for end in (start + 1)..=tree.len() {
                let proof = tree.build_range_proof(start, end).unwrap();
                let leaf_hashes: Vec<_> = (start..end).map(|i| tree.leaf_hash(i).unwrap().clone()).collect();
                proof.verify_range(&root, &leaf_hashes).unwrap();
            }
        }
    }

    #[test]
    fn range_proof_rejects_tampered_leaf() {
        let tree = tree_of(&[0, 0, 1, 1, 2]);
        let root = tree.root();
        let proof = tree.build_range_proof(1, 3).unwrap();
        let mut leaf_hashes: Vec<_> = (1..3).map(|i| tree.leaf_hash(i).unwrap().clone()).collect();
        leaf_hashes[0] =
            crate::namespaced_hash::NamespacedHash::hash_leaf(b"not-the-real-payload", NamespaceId::<1>([0]));
        assert!(proof.verify_range(&root, &leaf_hashes).is_err());
    }

    #[test]
    fn proof_does_not_mutate_its_own_siblings() {
        let tree = tree_of(&[0, 0, 1, 1, 2, 2, 3]);
        let root = tree.root();
        let proof = tree.build_range_proof(2, 5).unwrap();
        let before = proof.siblings().clone();
        let leaf_hashes: Vec<_> = (2..5).map(|i| tree.leaf_hash(i).unwrap().clone()).collect();
        proof.verify_range(&root, &leaf_hashes).unwrap();
        assert_eq!(&before, proof.siblings());
    }
}
