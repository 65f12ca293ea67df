//! Splay rotations
//!
//! A single rotation lifts node X over its parent P:
//!
//! ```text
//!        P                X                 P                  X
//!       / \              / \               / \                / \
//!      X   C    zig     A   P             C   X      zag     P   B
//!     / \      ----->      / \               / \    ----->  / \
//!    A   B                B   C             A   B          C   A
//! ```
//!
//! Masses are conditional, so each rotation first pushes X's mass down
//! onto its children, hands P's mass to X, and renormalises P's two new
//! children so that every touched sibling pair sums to one again.

use super::{NodeId, PartitionTree, Side};
use crate::numeric::Real;

impl PartitionTree {
    /// Right rotation of a left child over its parent.
    pub fn zig(&mut self, x: NodeId) {
        self.rotate(x, Side::Left);
    }

    /// Left rotation of a right child over its parent.
    pub fn zag(&mut self, x: NodeId) {
        self.rotate(x, Side::Right);
    }

    /// Splay `x` until it becomes the root.
    pub fn rotate_to_root(&mut self, x: NodeId) {
        self.splay(x, None);
    }

    /// Splay `x` upwards until its parent is `stop` (`None` = whole tree).
    ///
    /// Uses zig-zig / zag-zag when `x` and its parent lean the same way
    /// and zig-zag / zag-zig otherwise. `stop` must be an ancestor of `x`.
    pub fn splay(&mut self, x: NodeId, stop: Option<NodeId>) {
        loop {
            let parent = self.node(x).parent;
            if parent == stop {
                break;
            }
            let Some(p) = parent else {
                panic!("splay stop {stop:?} is not an ancestor of {x}");
            };
            let grandparent = self.node(p).parent;
            if grandparent == stop {
                self.rotate_up(x);
                break;
            }
            let Some(g) = grandparent else {
                panic!("splay stop {stop:?} is not an ancestor of {x}");
            };

            if self.side_of(p, x) == self.side_of(g, p) {
                self.rotate_up(p);
                self.rotate_up(x);
            } else {
                self.rotate_up(x);
                self.rotate_up(x);
            }
        }
        tracing::trace!(node = %x, "splayed");
    }

    /// Which child of `parent` is `child`; a mismatch is a broken tree.
    pub(crate) fn side_of(&self, parent: NodeId, child: NodeId) -> Side {
        let node = self.node(parent);
        if node.left == Some(child) {
            Side::Left
        } else if node.right == Some(child) {
            Side::Right
        } else {
            panic!("node {child} is not a child of {parent}");
        }
    }

    fn rotate_up(&mut self, x: NodeId) {
        let parent = self
            .node(x)
            .parent
            .unwrap_or_else(|| panic!("cannot rotate root {x}"));
        let side = self.side_of(parent, x);
        self.rotate(x, side);
    }

    fn rotate(&mut self, x: NodeId, side: Side) {
        let p = self
            .node(x)
            .parent
            .unwrap_or_else(|| panic!("cannot rotate root {x}"));
        let actual = self.side_of(p, x);
        assert!(
            actual == side,
            "node {x} is a {actual:?} child of {p}, not {side:?}"
        );
        let grandparent = self.node(p).parent;
        if let Some(g) = grandparent {
            let links = self.node(g);
            if links.left != Some(p) && links.right != Some(p) {
                panic!("grandparent {g} does not link to parent {p} while rotating {x}");
            }
        }

        let (a, b) = self
            .node(x)
            .children()
            .unwrap_or_else(|| panic!("cannot rotate leaf {x}"));
        let (parent_left, parent_right) = self
            .node(p)
            .children()
            .unwrap_or_else(|| panic!("parent {p} of {x} has a single child"));
        // outer stays under x, inner moves across to p, sibling is p's other child
        let (outer, inner, sibling) = match side {
            Side::Left => (a, b, parent_right),
            Side::Right => (b, a, parent_left),
        };

        let x_mass = self.node(x).mass.clone();
        let outer_mass = &self.node(outer).mass * &x_mass;
        let inner_mass = &self.node(inner).mass * &x_mass;
        let p_mass = outer_mass.complement();
        let p_start = self.node(p).start.clone();
        let p_length = self.node(p).length.clone();
        let p_new_length = &p_length - &self.node(outer).length;
        let inner_conditional = inner_mass.checked_div(&p_mass).unwrap_or_else(|| {
            // p keeps no mass: fall back to the uniform split by length
            self.node(inner)
                .length
                .checked_div(&p_new_length)
                .unwrap_or_else(Real::half)
        });

        let old_p_mass = std::mem::replace(&mut self.nodes[p.0].mass, p_mass);
        {
            let node = &mut self.nodes[x.0];
            node.mass = old_p_mass;
            node.start = p_start;
            node.length = p_length;
        }
        self.nodes[outer.0].mass = outer_mass;
        self.nodes[sibling.0].mass = inner_conditional.complement();
        self.nodes[inner.0].mass = inner_conditional;
        if side == Side::Left {
            self.nodes[p.0].start = self.nodes[inner.0].start.clone();
        }
        self.nodes[p.0].length = p_new_length;

        match side {
            Side::Left => {
                self.nodes[p.0].left = Some(inner);
                self.nodes[x.0].right = Some(p);
            }
            Side::Right => {
                self.nodes[p.0].right = Some(inner);
                self.nodes[x.0].left = Some(p);
            }
        }
        self.nodes[inner.0].parent = Some(p);
        self.nodes[p.0].parent = Some(x);
        self.nodes[x.0].parent = grandparent;
        match grandparent {
            None => self.root = x,
            Some(g) => {
                let links = &mut self.nodes[g.0];
                if links.left == Some(p) {
                    links.left = Some(x);
                } else {
                    links.right = Some(x);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Leaf;

    fn real(x: f64) -> Real {
        Real::try_from(x).unwrap()
    }

    fn assert_same_partition(before: &[Leaf], after: &[Leaf], tol: &Real) {
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after) {
            assert!(b.start.approx_eq(&a.start, tol), "{} vs {}", b.start, a.start);
            assert!(b.length.approx_eq(&a.length, tol));
            assert!(b.mass.approx_eq(&a.mass, tol), "{} vs {}", b.mass, a.mass);
        }
    }

    /// Root split at 0.5 with a refined left half: split node for 0.25.
    fn refined_tree() -> (PartitionTree, NodeId) {
        let mut tree = PartitionTree::new();
        let root = tree.root();
        tree.set_split(root, real(0.7)).unwrap();
        let boundary = tree.quantile(&real(0.35)).unwrap();
        let split = tree.parent(boundary).unwrap();
        (tree, split)
    }

    #[test]
    fn zig_preserves_distribution() {
        let (mut tree, split) = refined_tree();
        let before = tree.leaves();
        tree.zig(split);
        assert_eq!(tree.root(), split);
        assert_same_partition(&before, &tree.leaves(), tree.tolerance());
        tree.check_invariants().unwrap();

        let (left, _) = tree.node(split).children().unwrap();
        assert!(tree.node(left).mass().approx_eq(&real(0.35), tree.tolerance()));
    }

    #[test]
    fn zag_preserves_distribution() {
        let mut tree = PartitionTree::new();
        let root = tree.root();
        tree.set_split(root, real(0.2)).unwrap();
        let boundary = tree.quantile(&real(0.6)).unwrap();
        let split = tree.parent(boundary).unwrap();
        let before = tree.leaves();
        tree.zag(split);
        assert_eq!(tree.root(), split);
        assert_eq!(tree.boundary(boundary), &real(0.75));
        assert_same_partition(&before, &tree.leaves(), tree.tolerance());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn splay_brings_deep_split_to_root() {
        let mut tree = PartitionTree::new();
        for p in [0.25, 0.125, 0.0625, 0.03125, 0.4, 0.45] {
            tree.quantile(&real(p)).unwrap();
        }
        let boundary = tree.quantile(&real(0.1)).unwrap();
        let split = tree.parent(boundary).unwrap();
        let x = tree.boundary(boundary).clone();
        let before = tree.leaves();

        tree.rotate_to_root(split);

        assert_eq!(tree.root(), split);
        assert_eq!(tree.parent(split), None);
        let (left, right) = tree.node(split).children().unwrap();
        assert!(tree.node(right).start().approx_eq(&x, tree.tolerance()));
        assert!(tree.node(left).mass().approx_eq(&real(0.1), tree.tolerance()));
        assert_same_partition(&before, &tree.leaves(), tree.tolerance());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn splay_below_ancestor_stops_there() {
        let mut tree = PartitionTree::new();
        for p in [0.75, 0.875, 0.9375] {
            tree.quantile(&real(p)).unwrap();
        }
        let root = tree.root();
        let boundary = tree.quantile(&real(0.9)).unwrap();
        let split = tree.parent(boundary).unwrap();
        let before = tree.leaves();

        tree.splay(split, Some(root));

        assert_eq!(tree.root(), root);
        assert_eq!(tree.parent(split), Some(root));
        assert_eq!(tree.node(root).right(), Some(split));
        assert_same_partition(&before, &tree.leaves(), tree.tolerance());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn repeated_splays_keep_invariants() {
        let mut tree = PartitionTree::new();
        for i in 1..40u64 {
            let p = Real::ratio((i * 37) % 97 + 1, 99);
            let boundary = tree.quantile(&p).unwrap();
            let split = tree.parent(boundary).unwrap();
            tree.rotate_to_root(split);
            tree.check_invariants().unwrap();
        }
        assert!(tree.depth() < tree.node_count());
    }

    #[test]
    #[should_panic(expected = "does not link to parent")]
    fn broken_grandparent_link_aborts() {
        let mut tree = PartitionTree::new();
        tree.quantile(&real(0.25)).unwrap();
        let boundary = tree.quantile(&real(0.125)).unwrap();
        let split = tree.parent(boundary).unwrap();
        let parent = tree.parent(split).unwrap();
        let grandparent = tree.parent(parent).unwrap();
        // detach parent from the grandparent without fixing the back link
        let stray = tree.node(grandparent).right().unwrap();
        tree.nodes[grandparent.0].left = Some(stray);
        tree.zig(split);
    }
}
