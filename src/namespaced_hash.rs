//! Namespaced hashing: the digest type that carries a namespace-id range
//! alongside its hash, and the hasher that produces it.

use alloc::vec::Vec;
use core::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::simple_merkle::tree::MerkleHash;

/// Width, in bytes, of the SHA-256 digest this crate's shipped hasher uses.
pub const HASH_SIZE: usize = 32;

const LEAF_DOMAIN_SEPARATOR: u8 = 0;
const NODE_DOMAIN_SEPARATOR: u8 = 1;

/// Errors produced while hashing or validating namespaced leaves and nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NmtHasherError {
    /// A leaf was shorter than the namespace id size it was hashed against.
    #[error("leaf is shorter than the namespace id size")]
    InvalidLeafLen,
    /// A node's encoded byte string was too short to contain two namespace
    /// ids and a digest.
    #[error("node byte string is too short")]
    InvalidNodeLen,
    /// A node's encoded min namespace was greater than its max namespace.
    #[error("node's min namespace is greater than its max namespace")]
    InvalidNamespaceRange,
    /// Two siblings were combined out of namespace order.
    #[error("left sibling's max namespace exceeds right sibling's min namespace")]
    UnorderedSiblings,
    /// A namespace id was constructed from too few bytes.
    #[error("not enough bytes for the configured namespace id size")]
    MismatchedNamespaceSize,
}

/// A namespace identifier: a fixed-width byte string ordered lexicographically.
///
/// `N` is fixed at each call site's type, so trees/proofs built with
/// different namespace widths are distinct types and can't be mixed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "borsh", derive(borsh::BorshSerialize, borsh::BorshDeserialize))]
pub struct NamespaceId<const N: usize>(pub [u8; N]);

impl<const N: usize> NamespaceId<N> {
    /// The all-zero namespace id, the smallest possible value.
    pub fn min_id() -> Self {
        Self([0u8; N])
    }

    /// The all-ones namespace id. Treated as the reserved "parity share"
    /// sentinel by [`NamespacedHash::hash_nodes`] when `ignore_max_ns` is set.
    pub fn max_id() -> Self {
        Self([0xffu8; N])
    }

    /// Borrow the id as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Build a namespace id from the first `N` bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, NmtHasherError> {
        if bytes.len() < N {
            return Err(NmtHasherError::MismatchedNamespaceSize);
        }
        let mut id = [0u8; N];
        id.copy_from_slice(&bytes[..N]);
        Ok(Self(id))
    }
}

impl<const N: usize> fmt::Debug for NamespaceId<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamespaceId(")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

#[cfg(feature = "serde")]
impl<const N: usize> serde::Serialize for NamespaceId<N> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de, const N: usize> serde::Deserialize<'de> for NamespaceId<N> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NsIdVisitor<const N: usize>;

        impl<'de, const N: usize> serde::de::Visitor<'de> for NsIdVisitor<N> {
            type Value = NamespaceId<N>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a {N} byte namespace id")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                if v.len() != N {
                    return Err(E::invalid_length(v.len(), &self));
                }
                let mut id = [0u8; N];
                id.copy_from_slice(v);
                Ok(NamespaceId(id))
            }
        }

        deserializer.deserialize_bytes(NsIdVisitor::<N>)
    }
}

/// The digest stored at every node (leaf or inner) of a namespaced Merkle
/// tree: a SHA-256 hash plus the `[min, max]` namespace range of the
/// subtree it roots.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "borsh", derive(borsh::BorshSerialize, borsh::BorshDeserialize))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespacedHash<const N: usize> {
    min_namespace: NamespaceId<N>,
    max_namespace: NamespaceId<N>,
    hash: [u8; HASH_SIZE],
}

impl<const N: usize> fmt::Debug for NamespacedHash<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespacedHash")
            .field("min_namespace", &self.min_namespace)
            .field("max_namespace", &self.max_namespace)
            .field("hash", &hex_of(&self.hash))
            .finish()
    }
}

fn hex_of(bytes: &[u8]) -> alloc::string::String {
    use core::fmt::Write as _;
    let mut s = alloc::string::String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

impl<const N: usize> NamespacedHash<N> {
    /// The namespace range's lower bound.
    pub fn min_namespace(&self) -> NamespaceId<N> {
        self.min_namespace
    }

    /// The namespace range's upper bound.
    pub fn max_namespace(&self) -> NamespaceId<N> {
        self.max_namespace
    }

    /// The underlying SHA-256 digest, without the namespace range.
    pub fn hash(&self) -> &[u8; HASH_SIZE] {
        &self.hash
    }

    /// The digest of an empty tree: the hash of the empty string, with a
    /// degenerate (all-zero) namespace range.
    pub fn empty_root() -> Self {
        let hash: [u8; HASH_SIZE] = Sha256::digest(b"").into();
        Self {
            min_namespace: NamespaceId::min_id(),
            max_namespace: NamespaceId::min_id(),
            hash,
        }
    }

    /// Hash a leaf's payload under `namespace`: `H(0x00 || namespace || data)`,
    /// with `min_namespace == max_namespace == namespace`.
    ///
    /// Infallible: `namespace` is supplied by the caller rather than parsed
    /// out of `data`, so there's nothing here to reject.
    pub fn hash_leaf(data: &[u8], namespace: NamespaceId<N>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([LEAF_DOMAIN_SEPARATOR]);
        hasher.update(namespace.as_bytes());
        hasher.update(data);
        let hash: [u8; HASH_SIZE] = hasher.finalize().into();
        Self {
            min_namespace: namespace,
            max_namespace: namespace,
            hash,
        }
    }

    /// Combine two siblings' digests into their parent's: `H(0x01 || left || right)`,
    /// with the combined namespace range computed per the sentinel-elision rule
    /// when `ignore_max_ns` is set.
    ///
    /// Errors if the siblings are out of namespace order (`left.max_namespace
    /// > right.min_namespace`), which would mean the tree they came from
    /// wasn't built leaf-sorted by namespace.
    pub fn hash_nodes(left: &Self, right: &Self, ignore_max_ns: bool) -> Result<Self, NmtHasherError> {
        if left.max_namespace > right.min_namespace {
            return Err(NmtHasherError::UnorderedSiblings);
        }

        let min_namespace = left.min_namespace.min(right.min_namespace);
        let max_namespace = Self::combined_max_namespace(left, right, ignore_max_ns);

        let mut hasher = Sha256::new();
        hasher.update([NODE_DOMAIN_SEPARATOR]);
        hasher.update(left.min_namespace.as_bytes());
        hasher.update(left.max_namespace.as_bytes());
        hasher.update(left.hash);
        hasher.update(right.min_namespace.as_bytes());
        hasher.update(right.max_namespace.as_bytes());
        hasher.update(right.hash);
        let hash: [u8; HASH_SIZE] = hasher.finalize().into();

        Ok(Self {
            min_namespace,
            max_namespace,
            hash,
        })
    }

    fn combined_max_namespace(left: &Self, right: &Self, ignore_max_ns: bool) -> NamespaceId<N> {
        if ignore_max_ns {
            let sentinel = NamespaceId::<N>::max_id();
            if left.min_namespace == sentinel {
                // the entire subtree is sentinel-only data (e.g. parity shares)
                return sentinel;
            }
            if right.min_namespace == sentinel {
                // right subtree is sentinel-only: elide it from the max
                return left.max_namespace;
            }
        }
        left.max_namespace.max(right.max_namespace)
    }

    /// Encode this digest as `min_namespace || max_namespace || hash`.
    pub fn to_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * N + HASH_SIZE);
        out.extend_from_slice(self.min_namespace.as_bytes());
        out.extend_from_slice(self.max_namespace.as_bytes());
        out.extend_from_slice(&self.hash);
        out
    }
}

/// Check that `bytes` is long enough to be a leaf hashed against an `N`-byte
/// namespace, without actually hashing it.
pub fn validate_leaf(bytes: &[u8], namespace_size: usize) -> Result<(), NmtHasherError> {
    if bytes.len() < namespace_size {
        return Err(NmtHasherError::InvalidLeafLen);
    }
    Ok(())
}

/// Check that `bytes` is a well-formed encoded node (`min || max || hash`)
/// for an `N`-byte namespace, without reconstructing the digest.
pub fn validate_node_format(bytes: &[u8], namespace_size: usize) -> Result<(), NmtHasherError> {
    if bytes.len() < 2 * namespace_size {
        return Err(NmtHasherError::InvalidNodeLen);
    }
    let (min, rest) = bytes.split_at(namespace_size);
    let (max, _hash) = rest.split_at(namespace_size);
    if min > max {
        return Err(NmtHasherError::InvalidNamespaceRange);
    }
    Ok(())
}

/// A [`MerkleHash`] that produces [`NamespacedHash`] digests, optionally
/// eliding the all-ones sentinel namespace from combined namespace ranges.
#[derive(Clone, Copy, Debug, Default)]
pub struct NamespacedSha2Hasher<const N: usize> {
    ignore_max_ns: bool,
}

impl<const N: usize> NamespacedSha2Hasher<N> {
    /// Build a hasher with the sentinel-elision rule set explicitly.
    pub fn new(ignore_max_ns: bool) -> Self {
        Self { ignore_max_ns }
    }
}

impl<const N: usize> MerkleHash for NamespacedSha2Hasher<N> {
    type Output = NamespacedHash<N>;
    type Error = NmtHasherError;

    fn empty_root(&self) -> Self::Output {
        NamespacedHash::empty_root()
    }

    fn hash_leaf(&self, leaf: &[u8]) -> Result<Self::Output, Self::Error> {
        validate_leaf(leaf, N)?;
        let namespace = NamespaceId::from_slice(&leaf[..N])?;
        Ok(NamespacedHash::hash_leaf(&leaf[N..], namespace))
    }

    fn hash_nodes(&self, left: &Self::Output, right: &Self::Output) -> Result<Self::Output, Self::Error> {
        NamespacedHash::hash_nodes(left, right, self.ignore_max_ns)
    }
}

/// A [`MerkleHash`] that additionally tracks the sentinel-elision rule
/// ([`NamespacedHash::hash_nodes`]'s `ignore_max_ns` argument) as part of the
/// hasher's own configuration.
pub trait NamespaceMerkleHasher: MerkleHash {
    /// Build a hasher instance with `ignore_max_ns` set as given.
    fn with_ignore_max_ns(ignore_max_ns: bool) -> Self;

    /// Whether this hasher elides the all-ones sentinel namespace from
    /// combined namespace ranges.
    fn ignores_max_ns(&self) -> bool;
}

impl<const N: usize> NamespaceMerkleHasher for NamespacedSha2Hasher<N> {
    fn with_ignore_max_ns(ignore_max_ns: bool) -> Self {
        Self::new(ignore_max_ns)
    }

    fn ignores_max_ns(&self) -> bool {
        self.ignore_max_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_hash_is_deterministic_and_namespace_tagged() {
        let nid = NamespaceId::<1>([3]);
        let a = NamespacedHash::hash_leaf(b"payload", nid);
        let b = NamespacedHash::hash_leaf(b"payload", nid);
        assert_eq!(a, b);
        assert_eq!(a.min_namespace(), nid);
        assert_eq!(a.max_namespace(), nid);
    }

    #[test]
    fn different_payloads_hash_differently() {
        let nid = NamespaceId::<1>([3]);
        let a = NamespacedHash::hash_leaf(b"payload-a", nid);
        let b = NamespacedHash::hash_leaf(b"payload-b", nid);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn hash_nodes_rejects_out_of_order_siblings() {
        let left = NamespacedHash::hash_leaf(b"x", NamespaceId::<1>([5]));
        let right = NamespacedHash::hash_leaf(b"y", NamespaceId::<1>([2]));
        let err = NamespacedHash::hash_nodes(&left, &right, false).unwrap_err();
        assert_eq!(err, NmtHasherError::UnorderedSiblings);
    }

    #[test]
    fn hash_nodes_combines_namespace_range() {
        let left = NamespacedHash::hash_leaf(b"x", NamespaceId::<1>([1]));
        let right = NamespacedHash::hash_leaf(b"y", NamespaceId::<1>([4]));
        let parent = NamespacedHash::hash_nodes(&left, &right, false).unwrap();
        assert_eq!(parent.min_namespace(), NamespaceId::<1>([1]));
        assert_eq!(parent.max_namespace(), NamespaceId::<1>([4]));
    }

    #[test]
    fn ignore_max_ns_elides_sentinel_from_right_sibling() {
        let left = NamespacedHash::hash_leaf(b"x", NamespaceId::<1>([4]));
        let right = NamespacedHash::hash_leaf(b"parity", NamespaceId::<1>([0xff]));
        let combined = NamespacedHash::hash_nodes(&left, &right, true).unwrap();
        assert_eq!(combined.max_namespace(), NamespaceId::<1>([4]));

        let combined_without_rule = NamespacedHash::hash_nodes(&left, &right, false).unwrap();
        assert_eq!(combined_without_rule.max_namespace(), NamespaceId::<1>([0xff]));
    }

    #[test]
    fn ignore_max_ns_propagates_sentinel_when_left_is_all_sentinel() {
        let left = NamespacedHash::hash_leaf(b"parity0", NamespaceId::<1>([0xff]));
        let right = NamespacedHash::hash_leaf(b"parity1", NamespaceId::<1>([0xff]));
        let combined = NamespacedHash::hash_nodes(&left, &right, true).unwrap();
        assert_eq!(combined.max_namespace(), NamespaceId::<1>([0xff]));
        assert_eq!(combined.min_namespace(), NamespaceId::<1>([0xff]));
    }

    #[test]
    fn hasher_rejects_short_leaves() {
        let hasher = NamespacedSha2Hasher::<4>::new(false);
        let err = hasher.hash_leaf(&[1, 2]).unwrap_err();
        assert_eq!(err, NmtHasherError::InvalidLeafLen);
    }

    #[test]
    fn validate_node_format_rejects_inverted_range() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[9]); // min
        bytes.extend_from_slice(&[1]); // max < min
        bytes.extend_from_slice(&[0u8; HASH_SIZE]);
        let err = validate_node_format(&bytes, 1).unwrap_err();
        assert_eq!(err, NmtHasherError::InvalidNamespaceRange);
    }
}
