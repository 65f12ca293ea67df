#![allow(dead_code)]

use bitvec::prelude::*;
use posterior_matching::numeric::Real;
use posterior_matching::PartitionTree;

pub fn bits(text: &str) -> BitVec {
    text.chars().map(|c| c == '1').collect()
}

pub fn real(text: &str) -> Real {
    text.parse().expect("valid decimal literal")
}

/// Every k-bit message, most significant bit first.
pub fn all_messages(k: usize) -> Vec<BitVec> {
    (0..1u64 << k)
        .map(|m| (0..k).rev().map(|i| (m >> i) & 1 == 1).collect())
        .collect()
}

/// Absolute leaf masses in value order, for before/after comparisons.
pub fn leaf_masses(tree: &PartitionTree) -> Vec<Real> {
    tree.leaves().into_iter().map(|leaf| leaf.mass).collect()
}

/// Leaves must tile [0, 1) and carry total mass 1.
pub fn assert_tiles_unit_interval(tree: &PartitionTree) {
    let tol: Real = "1e-30".parse().expect("tolerance");
    let leaves = tree.leaves();
    let mut cursor = Real::zero();
    let mut total = Real::zero();
    for leaf in &leaves {
        assert!(leaf.start.approx_eq(&cursor, &tol), "gap before {}", leaf.start);
        cursor = &leaf.start + &leaf.length;
        total += &leaf.mass;
    }
    assert!(cursor.approx_eq(&Real::one(), &tol), "leaves end at {cursor}");
    assert!(total.approx_eq(&Real::one(), &tol), "total mass {total}");
}
