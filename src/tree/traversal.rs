//! Quantile and cumulative-mass descent
//!
//! Both queries walk from the root towards one boundary. When the boundary
//! falls strictly inside a leaf, the leaf is split there; mass inside a leaf
//! is taken to be spread uniformly over its length, so splitting at mass
//! fraction `p` also splits the length at fraction `p`.
//!
//! Boundaries belong to the right-hand interval: every interval is
//! `[start, start + length)`.

use super::{NodeId, PartitionTree, TreeError};
use crate::numeric::Real;

/// Where a value query ended up.
enum Descent {
    /// `x` is an existing boundary; carries the mass below it.
    Boundary(Real),
    /// `x` lies strictly inside `leaf`, at `offset` from its start.
    Inside {
        leaf: NodeId,
        below: Real,
        context: Real,
        offset: Real,
        fraction: Real,
    },
}

impl PartitionTree {
    /// Find (or create) the boundary `x` with `P([0, x)) = probability`.
    ///
    /// Returns the node whose interval starts at `x`. That node is always
    /// the right child of the internal node splitting at `x`, so the
    /// caller can splay `parent(result)` to make `x` the root split.
    pub fn quantile(&mut self, probability: &Real) -> Result<NodeId, TreeError> {
        let upper = self.tolerance.complement();
        if probability < &self.tolerance || probability > &upper {
            return Err(TreeError::ProbabilityOutOfRange(probability.to_f64()));
        }

        let mut id = self.root;
        let mut p = probability.clone();
        loop {
            let Some((left, right)) = self.node(id).children() else {
                return self.split_at_mass(id, p);
            };
            let left_mass = self.node(left).mass.clone();
            if left_mass.approx_eq(&p, &self.tolerance) {
                return Ok(right);
            }
            if left_mass < p {
                p = (&p - &left_mass)
                    .checked_div(&self.node(right).mass)
                    .ok_or(TreeError::DegenerateSplit { node: right })?;
                id = right;
            } else {
                p = p
                    .checked_div(&left_mass)
                    .ok_or(TreeError::DegenerateSplit { node: left })?;
                id = left;
            }
        }
    }

    /// Probability of `[0, x)`, splitting the leaf that contains `x` when
    /// `x` is not already a boundary.
    pub fn cumulative_mass(&mut self, x: &Real) -> Result<Real, TreeError> {
        match self.descend(x)? {
            Descent::Boundary(mass) => Ok(mass),
            Descent::Inside {
                leaf,
                below,
                context,
                offset,
                fraction,
            } => {
                self.split_leaf(leaf, offset, fraction.clone());
                Ok(below + context * fraction)
            }
        }
    }

    /// Probability of `[0, x)` without refining the partition.
    pub fn cdf(&self, x: &Real) -> Result<Real, TreeError> {
        match self.descend(x)? {
            Descent::Boundary(mass) => Ok(mass),
            Descent::Inside {
                below,
                context,
                fraction,
                ..
            } => Ok(below + context * fraction),
        }
    }

    fn descend(&self, x: &Real) -> Result<Descent, TreeError> {
        let span_start = self.node(self.root).start.clone();
        let span_end = self.node(self.root).end();
        if x < &(&span_start - &self.tolerance) || x > &(&span_end + &self.tolerance) {
            return Err(TreeError::ValueOutOfRange(x.to_f64()));
        }

        let mut id = self.root;
        let mut below = Real::zero();
        let mut context = Real::one();
        loop {
            let node = self.node(id);
            context = &context * &node.mass;
            if node.end().approx_eq(x, &self.tolerance) {
                return Ok(Descent::Boundary(below + context));
            }
            if node.start.approx_eq(x, &self.tolerance) {
                return Ok(Descent::Boundary(below));
            }
            let Some((left, right)) = node.children() else {
                let offset = x - &node.start;
                let fraction = offset
                    .checked_div(&node.length)
                    .ok_or(TreeError::DegenerateSplit { node: id })?;
                return Ok(Descent::Inside {
                    leaf: id,
                    below,
                    context,
                    offset,
                    fraction,
                });
            };
            let right_start = &self.node(right).start;
            if x > &(right_start + &self.tolerance) {
                below += &(&context * &self.node(left).mass);
                id = right;
            } else {
                id = left;
            }
        }
    }

    fn split_at_mass(&mut self, leaf: NodeId, p: Real) -> Result<NodeId, TreeError> {
        if p < self.tolerance || p > self.tolerance.complement() {
            return Err(TreeError::DegenerateSplit { node: leaf });
        }
        let left_length = &self.node(leaf).length * &p;
        let (_, right) = self.split_leaf(leaf, left_length, p);
        Ok(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real(x: f64) -> Real {
        Real::try_from(x).unwrap()
    }

    #[test]
    fn median_of_fresh_tree_is_existing_boundary() {
        let mut tree = PartitionTree::new();
        let before = tree.node_count();
        let node = tree.quantile(&Real::half()).unwrap();
        assert_eq!(tree.boundary(node), &Real::half());
        assert_eq!(tree.parent(node), Some(tree.root()));
        assert_eq!(tree.node_count(), before);
    }

    #[test]
    fn quantile_splits_leaf_proportionally() {
        let mut tree = PartitionTree::new();
        let node = tree.quantile(&real(0.25)).unwrap();
        assert_eq!(tree.boundary(node), &real(0.25));
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.node(node).length(), &real(0.25));
        assert_eq!(tree.node(node).mass(), &Real::half());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn quantile_follows_skewed_mass() {
        let mut tree = PartitionTree::new();
        let root = tree.root();
        tree.set_split(root, real(0.8)).unwrap();
        // 0.5 of the mass lies inside the left half at fraction 0.625
        let node = tree.quantile(&Real::half()).unwrap();
        assert_eq!(tree.boundary(node), &real(0.3125));
    }

    #[test]
    fn cumulative_mass_at_edges() {
        let mut tree = PartitionTree::new();
        assert_eq!(tree.cumulative_mass(&Real::zero()).unwrap(), Real::zero());
        assert_eq!(tree.cumulative_mass(&Real::one()).unwrap(), Real::one());
        assert_eq!(tree.cumulative_mass(&Real::half()).unwrap(), Real::half());
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn cumulative_mass_splits_by_value() {
        let mut tree = PartitionTree::new();
        let root = tree.root();
        tree.set_split(root, real(0.2)).unwrap();
        let below = tree.cumulative_mass(&real(0.75)).unwrap();
        assert_eq!(below, real(0.6));
        assert_eq!(tree.node_count(), 5);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn cdf_leaves_partition_untouched() {
        let mut tree = PartitionTree::new();
        let root = tree.root();
        tree.set_split(root, real(0.2)).unwrap();
        assert_eq!(tree.cdf(&real(0.75)).unwrap(), real(0.6));
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.cumulative_mass(&real(0.75)).unwrap(), real(0.6));
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn out_of_range_queries() {
        let mut tree = PartitionTree::new();
        assert!(matches!(
            tree.quantile(&Real::one()),
            Err(TreeError::ProbabilityOutOfRange(_))
        ));
        assert!(matches!(
            tree.quantile(&Real::zero()),
            Err(TreeError::ProbabilityOutOfRange(_))
        ));
        assert!(matches!(
            tree.cumulative_mass(&real(1.5)),
            Err(TreeError::ValueOutOfRange(_))
        ));
        assert!(matches!(
            tree.cumulative_mass(&real(-0.1)),
            Err(TreeError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn quantile_inverts_cumulative_mass() {
        let mut tree = PartitionTree::new();
        let root = tree.root();
        tree.set_split(root, real(0.3)).unwrap();
        for p in [0.05, 0.3, 0.42, 0.77, 0.9] {
            let node = tree.quantile(&real(p)).unwrap();
            let x = tree.boundary(node).clone();
            let back = tree.cumulative_mass(&x).unwrap();
            assert!(back.approx_eq(&real(p), tree.tolerance()), "p={p}");
        }
        tree.check_invariants().unwrap();
    }
}
