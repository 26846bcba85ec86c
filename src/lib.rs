//! A namespaced Merkle tree (NMT): an ordered, append-only Merkle tree whose
//! leaves are tagged with a namespace id and sorted by it, where every inner
//! node additionally commits to the `[min, max]` namespace range of its
//! subtree.
//!
//! That extra commitment is what lets [`nmt_proof::NamespaceProof::verify_complete_namespace`]
//! prove, against a single root, that a set of leaves is the *complete* set
//! of leaves belonging to some namespace — not just that they're present,
//! but that nothing from that namespace was left out. A plain Merkle range
//! proof can't make that second claim on its own.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod namespaced_hash;
pub mod nmt_proof;
pub mod simple_merkle;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Range;

use thiserror::Error;

use namespaced_hash::{NamespaceId, NamespaceMerkleHasher, NamespacedHash};
use nmt_proof::NamespaceProof;
use simple_merkle::db::Db;
use simple_merkle::error::RangeProofError;
use simple_merkle::proof::Proof;
use simple_merkle::tree::MerkleTree;

/// Errors raised while building a [`NamespaceMerkleTree`] (as opposed to
/// proving or verifying against one, see [`RangeProofError`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NmtError {
    /// A pushed leaf was shorter than the tree's configured namespace id size.
    #[error("leaf is shorter than the tree's namespace id size")]
    MismatchedNamespaceSize,
    /// A pushed leaf's namespace id is less than the previous leaf's.
    #[error("pushed leaf's namespace id ({new:?}) is less than the previous leaf's ({previous:?})")]
    InvalidPushOrder {
        /// The namespace id of the leaf that was already in the tree.
        previous: Vec<u8>,
        /// The out-of-order namespace id that was rejected.
        new: Vec<u8>,
    },
}

/// An ordered Merkle tree over leaves `namespace_id || payload`, sorted by
/// namespace id, whose inner nodes commit to their subtree's namespace range.
///
/// `NS_ID_SIZE` is fixed at the type level, so trees of different namespace
/// widths can't be mixed up at compile time.
pub struct NamespaceMerkleTree<D, M, const NS_ID_SIZE: usize>
where
    M: NamespaceMerkleHasher<Output = NamespacedHash<NS_ID_SIZE>>,
{
    pub(crate) inner: MerkleTree<D, M>,
    ranges: BTreeMap<NamespaceId<NS_ID_SIZE>, Range<usize>>,
}

impl<D, M, const NS_ID_SIZE: usize> NamespaceMerkleTree<D, M, NS_ID_SIZE>
where
    D: Db<NamespacedHash<NS_ID_SIZE>> + Default,
    M: NamespaceMerkleHasher<Output = NamespacedHash<NS_ID_SIZE>>,
{
    /// Build an empty tree with a default-constructed hasher
    /// (`ignore_max_ns = false`).
    pub fn new() -> Self {
        Self::with_hasher(M::default())
    }

    /// Build an empty tree using the given hasher.
    pub fn with_hasher(hasher: M) -> Self {
        Self {
            inner: MerkleTree::with_hasher(hasher),
            ranges: BTreeMap::new(),
        }
    }
}

impl<D, M, const NS_ID_SIZE: usize> Default for NamespaceMerkleTree<D, M, NS_ID_SIZE>
where
    D: Db<NamespacedHash<NS_ID_SIZE>> + Default,
    M: NamespaceMerkleHasher<Output = NamespacedHash<NS_ID_SIZE>>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D, M, const NS_ID_SIZE: usize> NamespaceMerkleTree<D, M, NS_ID_SIZE>
where
    D: Db<NamespacedHash<NS_ID_SIZE>>,
    M: NamespaceMerkleHasher<Output = NamespacedHash<NS_ID_SIZE>>,
    M::Error: Into<RangeProofError>,
{
    /// Number of leaves pushed so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The tree's root digest.
    pub fn root(&self) -> NamespacedHash<NS_ID_SIZE> {
        self.inner.root()
    }

    /// Append a leaf (`namespace_id || payload`).
    ///
    /// Errors if `leaf` is shorter than `NS_ID_SIZE`, or if its namespace id
    /// is less than the previous leaf's — leaves must be pushed in
    /// non-decreasing namespace order.
    pub fn push(&mut self, leaf: Vec<u8>) -> Result<(), NmtError> {
        if leaf.len() < NS_ID_SIZE {
            return Err(NmtError::MismatchedNamespaceSize);
        }
        let namespace = NamespaceId::<NS_ID_SIZE>::from_slice(&leaf[..NS_ID_SIZE])
            .map_err(|_| NmtError::MismatchedNamespaceSize)?;

        if let Some((&last_namespace, _)) = self.ranges.iter().next_back() {
            if namespace < last_namespace {
                return Err(NmtError::InvalidPushOrder {
                    previous: last_namespace.as_bytes().to_vec(),
                    new: namespace.as_bytes().to_vec(),
                });
            }
        }

        let index = self.inner.len();
        self.inner
            .push_leaf(leaf)
            .map_err(|_| NmtError::MismatchedNamespaceSize)?;

        self.ranges
            .entry(namespace)
            .and_modify(|range| range.end = index + 1)
            .or_insert(index..index + 1);

        Ok(())
    }

    /// All leaves (raw `namespace_id || payload` bytes) recorded under `namespace`.
    pub fn get(&self, namespace: NamespaceId<NS_ID_SIZE>) -> Vec<&[u8]> {
        match self.ranges.get(&namespace) {
            Some(range) => range.clone().filter_map(|i| self.inner.leaf(i)).collect(),
            None => Vec::new(),
        }
    }

    /// The leaf index range occupied by `namespace`, if any leaves were
    /// pushed under it.
    pub fn namespace_range(&self, namespace: NamespaceId<NS_ID_SIZE>) -> Option<Range<usize>> {
        self.ranges.get(&namespace).cloned()
    }

    /// Prove inclusion of the single leaf at `index`.
    pub fn prove(&self, index: usize) -> Result<NamespaceProof<M, NS_ID_SIZE>, RangeProofError> {
        self.prove_range(index, index + 1)
    }

    /// Prove inclusion of the leaves `[start, end)`.
    pub fn prove_range(
        &self,
        start: usize,
        end: usize,
    ) -> Result<NamespaceProof<M, NS_ID_SIZE>, RangeProofError> {
        let proof = self.inner.build_range_proof(start, end)?;
        Ok(NamespaceProof::PresenceProof {
            proof,
            ignore_max_ns: self.ignores_max_ns(),
        })
    }

    /// Prove the (possibly empty) set of leaves belonging to `namespace`.
    ///
    /// Returns a presence proof if the namespace has leaves, an absence
    /// proof (naming the single boundary leaf whose namespace brackets the
    /// query) if the namespace falls in a gap between two other namespaces,
    /// or an empty (out-of-range) proof if `namespace` is outside the root's
    /// own `[min, max]` namespace range entirely.
    pub fn prove_namespace(
        &self,
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> Result<NamespaceProof<M, NS_ID_SIZE>, RangeProofError> {
        if let Some(range) = self.ranges.get(&namespace) {
            return self.prove_range(range.start, range.end);
        }

        if self.is_empty() {
            return Ok(NamespaceProof::PresenceProof {
                proof: Proof {
                    siblings: Vec::new(),
                    start: 0,
                    end: 0,
                },
                ignore_max_ns: self.ignores_max_ns(),
            });
        }

        // Bound against the namespaces actually pushed, not `self.root()`'s
        // namespace range: `ignore_max_ns`'s sentinel elision is a hash-level
        // rule (see `combined_max_namespace`) and can make the root's own
        // `max_namespace()` strictly less than the true maximum pushed id,
        // which would otherwise misclassify a gap query past an elided
        // sentinel as out-of-range instead of a gap-absence proof.
        let min_seen = *self
            .ranges
            .keys()
            .next()
            .expect("already checked self.is_empty() above");
        let max_seen = *self
            .ranges
            .keys()
            .next_back()
            .expect("already checked self.is_empty() above");
        if namespace < min_seen || namespace > max_seen {
            return Ok(NamespaceProof::PresenceProof {
                proof: Proof {
                    siblings: Vec::new(),
                    start: 0,
                    end: 0,
                },
                ignore_max_ns: self.ignores_max_ns(),
            });
        }

        // namespace sits in a gap: find the first leaf whose namespace is
        // strictly greater, and build an absence proof around it.
        let boundary_index = self
            .ranges
            .range((core::ops::Bound::Excluded(namespace), core::ops::Bound::Unbounded))
            .next()
            .map(|(_, range)| range.start)
            .expect("namespace is within the root's range but not in `ranges`, so a greater entry must exist");

        let mut proof = self.prove_range(boundary_index, boundary_index + 1)?;
        let leaf_hash = self
            .inner
            .leaf_hash(boundary_index)
            .cloned()
            .expect("boundary_index came from this tree's own ranges map");
        proof.convert_to_absence_proof(leaf_hash);
        Ok(proof)
    }

    /// Verify that `raw_leaves` (leaf payloads, namespace id stripped) are
    /// the complete, correctly-ordered contents of `namespace` under `root`,
    /// per `proof`.
    pub fn verify_namespace(
        &self,
        root: &NamespacedHash<NS_ID_SIZE>,
        raw_leaves: &[impl AsRef<[u8]>],
        namespace: NamespaceId<NS_ID_SIZE>,
        proof: &NamespaceProof<M, NS_ID_SIZE>,
    ) -> Result<(), RangeProofError> {
        let merkle_proof = proof.merkle_proof();
        let start = merkle_proof.start_idx() as usize;
        let end = merkle_proof.end_idx() as usize;

        if start > end {
            return Err(RangeProofError::MalformedProof);
        }

        if start == end {
            if !raw_leaves.is_empty() || !merkle_proof.siblings().is_empty() {
                return Err(RangeProofError::MalformedProof);
            }
            if namespace < root.min_namespace() || namespace > root.max_namespace() {
                return Ok(());
            }
            return Err(RangeProofError::MalformedProof);
        }

        match proof {
            NamespaceProof::AbsenceProof { leaf, .. } => {
                if !raw_leaves.is_empty() {
                    return Err(RangeProofError::WrongAmountOfLeavesProvided);
                }
                let leaf_hash = leaf.ok_or(RangeProofError::MalformedProof)?;
                if leaf_hash.min_namespace() == namespace || leaf_hash.max_namespace() == namespace {
                    return Err(RangeProofError::MalformedProof);
                }
                let mut siblings = merkle_proof.siblings().iter().collect();
                self.inner
                    .check_range_proof(root, &[leaf_hash], &mut siblings, start)?;
            }
            NamespaceProof::PresenceProof { .. } => {
                if raw_leaves.len() != end - start {
                    return Err(RangeProofError::WrongAmountOfLeavesProvided);
                }
                let leaf_hashes: Vec<_> = raw_leaves
                    .iter()
                    .map(|data| NamespacedHash::hash_leaf(data.as_ref(), namespace))
                    .collect();
                let mut siblings = merkle_proof.siblings().iter().collect();
                self.inner
                    .check_range_proof(root, &leaf_hashes, &mut siblings, start)?;
            }
        }

        check_completeness(merkle_proof, namespace)
    }

    fn ignores_max_ns(&self) -> bool {
        self.inner.hasher().ignores_max_ns()
    }
}

/// Check that no sibling consumed by `proof` could itself contain a leaf of
/// `namespace` — the invariant that makes a namespace proof *complete*
/// rather than merely an inclusion proof for whatever leaves were handed in.
///
/// Checking every left/right sibling (not just the one immediately adjacent
/// to the range) is redundant but harmless: namespace ids are monotonic
/// across the sibling list, so a non-adjacent sibling's bound is never
/// tighter than its neighbor's.
fn check_completeness<M, const NS_ID_SIZE: usize>(
    merkle_proof: &Proof<M>,
    namespace: NamespaceId<NS_ID_SIZE>,
) -> Result<(), RangeProofError>
where
    M: simple_merkle::tree::MerkleHash<Output = NamespacedHash<NS_ID_SIZE>>,
{
    for left in merkle_proof.left_siblings() {
        if left.max_namespace() >= namespace {
            return Err(RangeProofError::MissingLeftNeighbor);
        }
    }
    for right in merkle_proof.right_siblings() {
        if right.min_namespace() <= namespace {
            return Err(RangeProofError::MissingRightNeighbor);
        }
    }
    Ok(())
}
