//! Errors produced while building or verifying range proofs.

use thiserror::Error;

use crate::namespaced_hash::NmtHasherError;

/// Everything that can go wrong building or checking a [`super::proof::Proof`]
/// or a [`crate::nmt_proof::NamespaceProof`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeProofError {
    /// No leaves were supplied to check a non-empty range against.
    #[error("no leaves were provided to verify against")]
    NoLeavesProvided,
    /// The number of supplied leaves didn't match the range the proof claims.
    #[error("wrong amount of leaves provided")]
    WrongAmountOfLeavesProvided,
    /// The proof's shape (start/end/siblings/leaf) is internally inconsistent.
    #[error("proof is malformed")]
    MalformedProof,
    /// The requested range doesn't fit inside the tree being proved against.
    #[error("the range [{start}, {end}) is out of bounds for a tree of {len} leaves")]
    RangeOutOfBounds {
        /// Requested range start.
        start: usize,
        /// Requested range end (exclusive).
        end: usize,
        /// Number of leaves in the tree.
        len: usize,
    },
    /// A proof was requested against, or a completeness check ran over, an
    /// empty tree.
    #[error("tree is empty")]
    TreeIsEmpty,
    /// The namespace's left boundary isn't proven complete: the sibling
    /// immediately to the left still overlaps the claimed namespace.
    #[error("missing a left neighbor proving completeness of the namespace")]
    MissingLeftNeighbor,
    /// The namespace's right boundary isn't proven complete: the sibling
    /// immediately to the right still overlaps the claimed namespace.
    #[error("missing a right neighbor proving completeness of the namespace")]
    MissingRightNeighbor,
    /// The digest recomputed from the proof didn't match the expected root.
    #[error("recomputed root does not match the expected root")]
    RootMismatch,
    /// A lower-level hashing error (malformed node/leaf, out-of-order
    /// siblings) surfaced while recomputing the root.
    #[error(transparent)]
    HasherError(#[from] NmtHasherError),
}
