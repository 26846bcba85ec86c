//! Index arithmetic for the canonical, left-perfect binary split this crate's
//! trees and proofs use.

/// The split point for a subtree covering `m` leaves (`m >= 2`): the largest
/// power of two strictly less than `m`. The left child gets this many
/// leaves, the right child gets the rest.
pub fn left_subtree_size(m: usize) -> usize {
    debug_assert!(m >= 2, "left_subtree_size is only defined for m >= 2");
    let mut k = 1usize;
    while k * 2 < m {
        k *= 2;
    }
    k
}

/// How many of a [`super::proof::Proof`]'s siblings are "left" siblings
/// (covering leaves before the proven range's `start`), given `start`.
///
/// This is the number of terms in the binary (powers-of-two) decomposition
/// of `start`, i.e. `start`'s popcount — independent of the tree's total
/// size, which is why a [`super::proof::Proof`] doesn't need to carry it.
pub fn compute_num_left_siblings(start: usize) -> usize {
    start.count_ones() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_subtree_size_is_largest_strict_power_of_two_below_m() {
        assert_eq!(left_subtree_size(2), 1);
        assert_eq!(left_subtree_size(3), 2);
        assert_eq!(left_subtree_size(4), 2);
        assert_eq!(left_subtree_size(5), 4);
        assert_eq!(left_subtree_size(8), 4);
        assert_eq!(left_subtree_size(9), 8);
    }

    #[test]
    fn num_left_siblings_matches_popcount() {
        assert_eq!(compute_num_left_siblings(0), 0);
        assert_eq!(compute_num_left_siblings(1), 1);
        assert_eq!(compute_num_left_siblings(2), 1);
        assert_eq!(compute_num_left_siblings(3), 2);
        assert_eq!(compute_num_left_siblings(5), 2);
        assert_eq!(compute_num_left_siblings(7), 3);
    }
}
