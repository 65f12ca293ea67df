use posterior_matching::numeric::Real;
use posterior_matching::PartitionTree;
use proptest::prelude::*;

mod common;
use common::*;

#[derive(Debug, Clone)]
enum Op {
    Quantile(f64),
    Cumulative(f64),
    Reweight(f64),
    SplayQuantile(f64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0.01f64..0.99).prop_map(Op::Quantile),
        (0.0f64..1.0).prop_map(Op::Cumulative),
        (0.05f64..0.95).prop_map(Op::Reweight),
        (0.01f64..0.99).prop_map(Op::SplayQuantile),
    ]
}

fn to_real(x: f64) -> Real {
    Real::try_from(x).expect("finite input")
}

fn apply(tree: &mut PartitionTree, op: &Op) {
    match op {
        Op::Quantile(p) => {
            tree.quantile(&to_real(*p)).expect("quantile succeeds");
        }
        Op::Cumulative(x) => {
            tree.cumulative_mass(&to_real(*x)).expect("cumulative mass succeeds");
        }
        Op::Reweight(left) => {
            let root = tree.root();
            tree.set_split(root, to_real(*left)).expect("root is internal");
        }
        Op::SplayQuantile(p) => {
            let node = tree.quantile(&to_real(*p)).expect("quantile succeeds");
            let split = tree.parent(node).expect("boundary node has a parent");
            tree.rotate_to_root(split);
        }
    }
}

proptest! {
    #[test]
    fn partition_invariant_survives_any_history(ops in proptest::collection::vec(op(), 1..40)) {
        let mut tree = PartitionTree::new();
        let mut nodes = tree.node_count();
        for op in &ops {
            apply(&mut tree, op);
            prop_assert!(tree.check_invariants().is_ok(), "{:?}", tree.check_invariants());
            prop_assert!(tree.node_count() >= nodes, "tree never shrinks");
            nodes = tree.node_count();
        }
        assert_tiles_unit_interval(&tree);
    }

    #[test]
    fn quantile_inverts_cumulative_mass(
        ops in proptest::collection::vec(op(), 0..25),
        p in 0.01f64..0.99,
    ) {
        let mut tree = PartitionTree::new();
        for op in &ops {
            apply(&mut tree, op);
        }
        let p = to_real(p);
        let node = tree.quantile(&p).expect("quantile succeeds");
        let x = tree.boundary(node).clone();
        let back = tree.cumulative_mass(&x).expect("cumulative mass succeeds");
        prop_assert!(back.approx_eq(&p, tree.tolerance()), "p={} back={}", p, back);
        prop_assert!(tree.cdf(&x).expect("cdf succeeds").approx_eq(&p, tree.tolerance()));
    }

    #[test]
    fn splaying_preserves_the_distribution(
        ops in proptest::collection::vec(op(), 1..25),
        probe in 0.0f64..1.0,
    ) {
        let mut tree = PartitionTree::new();
        for op in &ops {
            apply(&mut tree, op);
        }
        let probe = to_real(probe);
        let before = tree.cdf(&probe).expect("cdf succeeds");
        let median = tree.quantile(&Real::half()).expect("median exists");
        let split = tree.parent(median).expect("boundary node has a parent");
        tree.rotate_to_root(split);
        let after = tree.cdf(&probe).expect("cdf succeeds");
        let tol: Real = "1e-40".parse().expect("tolerance");
        prop_assert!(before.approx_eq(&after, &tol), "before={} after={}", before, after);
        prop_assert_eq!(tree.root(), split);
    }
}

#[test]
fn long_skewed_history_stays_normalised() {
    // repeatedly pile mass onto one side, as a long transmission does
    let mut tree = PartitionTree::new();
    for _ in 0..300 {
        let root = tree.root();
        tree.set_split(root, real("0.2")).expect("root is internal");
        let median = tree.quantile(&Real::half()).expect("median exists");
        let split = tree.parent(median).expect("boundary node has a parent");
        tree.rotate_to_root(split);
    }
    tree.check_invariants().expect("invariants hold");
    assert_tiles_unit_interval(&tree);

    // the posterior is now concentrated far below f64 resolution
    let leaves = tree.leaves();
    let smallest = leaves
        .iter()
        .map(|leaf| leaf.length.clone())
        .min()
        .expect("non-empty");
    assert!(!smallest.is_zero());
    assert!(smallest.to_f64() < 1e-20);
}
