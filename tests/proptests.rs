//! Property-based tests over the quantified invariants of namespace proofs:
//! built from randomized trees rather than the handful of fixed trees in the
//! unit tests.

use nmt_rs::namespaced_hash::{NamespaceId, NamespacedHash, NamespacedSha2Hasher};
use nmt_rs::simple_merkle::db::NoopDb;
use nmt_rs::NamespaceMerkleTree;
use proptest::collection::vec as pvec;
use proptest::prelude::*;

type TestTree = NamespaceMerkleTree<NoopDb, NamespacedSha2Hasher<1>, 1>;

fn leaf(nid: u8, payload: &[u8]) -> Vec<u8> {
    let mut leaf = vec![nid];
    leaf.extend_from_slice(payload);
    leaf
}

/// A tree built from namespace ids sorted (but not deduplicated) so pushing
/// them in order never violates the monotonic-push invariant.
fn sorted_entries() -> impl Strategy<Value = Vec<(u8, Vec<u8>)>> {
    pvec((any::<u8>(), pvec(any::<u8>(), 0..8)), 1..40).prop_map(|mut entries| {
        entries.sort_by_key(|(nid, _)| *nid);
        entries
    })
}

fn build(entries: &[(u8, Vec<u8>)]) -> TestTree {
    let mut tree = TestTree::with_hasher(NamespacedSha2Hasher::with_ignore_max_ns(false));
    for (nid, payload) in entries {
        tree.push(leaf(*nid, payload)).unwrap();
    }
    tree
}

/// Sorted entries whose namespace ids never touch the `0xFF` sentinel, so a
/// caller can append a trailing run of sentinel leaves itself and stay
/// push-order-monotonic.
fn sorted_non_sentinel_entries() -> impl Strategy<Value = Vec<(u8, Vec<u8>)>> {
    pvec((0u8..=253, pvec(any::<u8>(), 0..8)), 1..20).prop_map(|mut entries| {
        entries.sort_by_key(|(nid, _)| *nid);
        entries
    })
}

proptest! {
    /// Every namespace actually present in a randomly built tree round-trips
    /// through `prove_namespace` / `verify_complete_namespace` as a presence
    /// proof over exactly that namespace's leaves.
    #[test]
    fn presence_proof_round_trips_for_any_tree(entries in sorted_entries()) {
        let tree = build(&entries);
        let root = tree.root();
        let present: std::collections::BTreeSet<u8> = entries.iter().map(|(nid, _)| *nid).collect();

        for nid in present {
            let namespace = NamespaceId([nid]);
            let proof = tree.prove_namespace(namespace).unwrap();
            prop_assert!(proof.is_of_presence());
            let leaves = tree.get(namespace);
            prop_assert!(proof
                .verify_complete_namespace(&root, &leaves, namespace)
                .is_ok());
        }
    }

    /// Any namespace id with no leaves in the tree (gap or out-of-range)
    /// verifies as empty against an empty leaf slice.
    #[test]
    fn absent_namespace_verifies_empty(entries in sorted_entries(), query in any::<u8>()) {
        let tree = build(&entries);
        let present: std::collections::BTreeSet<u8> = entries.iter().map(|(nid, _)| *nid).collect();
        prop_assume!(!present.contains(&query));

        let root = tree.root();
        let namespace = NamespaceId([query]);
        let proof = tree.prove_namespace(namespace).unwrap();
        prop_assert!(proof
            .verify_complete_namespace(&root, &[] as &[&[u8]], namespace)
            .is_ok());
    }

    /// A root that wasn't actually produced by the tree must make every
    /// presence proof in the tree fail to verify, no matter which namespace
    /// id it was tagged with.
    #[test]
    fn wrong_root_rejects_every_presence_proof(entries in sorted_entries(), tag in any::<u8>()) {
        let tree = build(&entries);
        let real_root = tree.root();
        let wrong_root = NamespacedHash::<1>::hash_leaf(b"not-the-real-root", NamespaceId([tag]));
        prop_assume!(wrong_root != real_root);

        let present: std::collections::BTreeSet<u8> = entries.iter().map(|(nid, _)| *nid).collect();
        for nid in present {
            let namespace = NamespaceId([nid]);
            let proof = tree.prove_namespace(namespace).unwrap();
            let leaves = tree.get(namespace);
            prop_assert!(proof
                .verify_complete_namespace(&wrong_root, &leaves, namespace)
                .is_err());
        }
    }

    /// Dropping any single leaf belonging to a namespace from the leaves
    /// handed to verification must be rejected, either as a leaf-count
    /// mismatch or (if counts happen to realign) a root mismatch.
    #[test]
    fn dropping_a_leaf_breaks_verification(entries in sorted_entries()) {
        let tree = build(&entries);
        let root = tree.root();
        let present: Vec<u8> = {
            let mut v: Vec<u8> = entries.iter().map(|(nid, _)| *nid).collect();
            v.sort_unstable();
            v.dedup();
            v
        };

        for nid in present {
            let namespace = NamespaceId([nid]);
            let leaves = tree.get(namespace);
            if leaves.len() < 2 {
                continue;
            }
            let proof = tree.prove_namespace(namespace).unwrap();
            let partial = &leaves[1..];
            prop_assert!(proof
                .verify_complete_namespace(&root, partial, namespace)
                .is_err());
        }
    }

    /// Pushing namespace ids out of non-decreasing order is always rejected,
    /// regardless of how many in-order leaves came before.
    #[test]
    fn push_out_of_order_always_rejected(entries in sorted_entries(), drop in any::<u8>()) {
        let mut tree = build(&entries);
        let last_namespace = entries.last().map(|(nid, _)| *nid).unwrap_or(0);
        prop_assume!(drop < last_namespace);
        prop_assert!(tree.push(leaf(drop, b"x")).is_err());
    }

    /// A namespace id strictly greater than every id in the tree (or an
    /// empty tree) always yields an out-of-range empty proof, never a gap
    /// absence proof.
    #[test]
    fn namespace_above_every_leaf_yields_empty_proof(entries in sorted_entries()) {
        let tree = build(&entries);
        let max_present = entries.iter().map(|(nid, _)| *nid).max().unwrap_or(0);
        prop_assume!(max_present < 255);
        let namespace = NamespaceId([255]);
        let proof = tree.prove_namespace(namespace).unwrap();
        prop_assert_eq!(proof.start_idx(), proof.end_idx());
        prop_assert!(!proof.is_of_absence());
    }

    /// With `ignore_max_ns` set, a gap namespace strictly between the last
    /// non-sentinel id and the trailing run of `0xFF` sentinel leaves must
    /// still yield a gap-absence proof, even though the sentinel-elision
    /// rule makes `root().max_namespace()` come out less than the true
    /// maximum id ever pushed (the true max being `0xFF`).
    #[test]
    fn gap_past_elided_sentinel_max_is_still_absence(
        entries in sorted_non_sentinel_entries(),
        sentinel_count in 1usize..5,
    ) {
        let last_regular = entries.last().map(|(nid, _)| *nid).unwrap();
        prop_assume!(last_regular < 254);
        let query = NamespaceId([last_regular + 1]);

        let mut tree = TestTree::with_hasher(NamespacedSha2Hasher::with_ignore_max_ns(true));
        for (nid, payload) in &entries {
            tree.push(leaf(*nid, payload)).unwrap();
        }
        for i in 0..sentinel_count {
            tree.push(leaf(0xFF, &[i as u8])).unwrap();
        }

        let root = tree.root();
        prop_assert!(root.max_namespace() <= NamespaceId([last_regular]));

        let proof = tree.prove_namespace(query).unwrap();
        prop_assert!(proof.is_of_absence());
        prop_assert!(proof
            .verify_complete_namespace(&root, &[] as &[&[u8]], query)
            .is_ok());
    }
}
