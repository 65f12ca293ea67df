//! Weighted partition tree
//!
//! The posterior over the message value is a piecewise-uniform density on
//! [0, 1). Each leaf owns one piece; each internal node splits its interval
//! in two and stores, on each child, the probability of that child given
//! the parent. Absolute probability = product of masses along the path.
//!
//! Queries refine the partition lazily (a query landing strictly inside a
//! leaf splits it) and accessed split points are splayed to the root, so
//! the tree only ever grows and the root split is the most recent one.

mod node;
mod rotation;
mod traversal;

pub use node::{NodeId, PartitionNode, Side};

use thiserror::Error;

use crate::numeric::Real;

/// Errors reported by tree queries and updates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// Quantile probability outside `[tolerance, 1 - tolerance]`.
    #[error("probability {0} outside the open unit interval")]
    ProbabilityOutOfRange(f64),

    /// Cumulative-mass query outside the tree's value span.
    #[error("value {0} outside the partitioned interval")]
    ValueOutOfRange(f64),

    /// A split would create an empty or full child.
    #[error("degenerate split requested at node {node}")]
    DegenerateSplit {
        /// Leaf that would have been split.
        node: NodeId,
    },

    /// `set_split` was called on a leaf.
    #[error("node {0} is a leaf and has no split to update")]
    NotInternal(NodeId),

    /// Conditional mass outside `[0, 1]`.
    #[error("conditional mass {0} outside [0, 1]")]
    InvalidMass(f64),

    /// Structural or numeric invariant does not hold.
    #[error("partition invariant violated: {0}")]
    InvariantViolation(String),
}

/// One piece of the piecewise-uniform posterior.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Leaf {
    /// Lower edge of the piece.
    pub start: Real,
    /// Width of the piece.
    pub length: Real,
    /// Absolute probability of the piece.
    pub mass: Real,
}

/// Probability-weighted partition of [0, 1) stored as an arena splay tree.
#[derive(Debug, Clone)]
pub struct PartitionTree {
    nodes: Vec<PartitionNode>,
    root: NodeId,
    tolerance: Real,
}

impl PartitionTree {
    /// Two equal halves of [0, 1) under a root of mass 1.
    pub fn new() -> Self {
        Self::with_tolerance(Real::default_tolerance())
    }

    /// Same as [`PartitionTree::new`] with a custom boundary tolerance.
    pub fn with_tolerance(tolerance: Real) -> Self {
        let mut tree = Self {
            nodes: vec![PartitionNode::new(Real::zero(), Real::one(), Real::one())],
            root: NodeId(0),
            tolerance,
        };
        let root = tree.root;
        tree.split_leaf(root, Real::half(), Real::half());
        tree
    }

    /// Boundary tolerance.
    pub fn tolerance(&self) -> &Real {
        &self.tolerance
    }

    /// Current root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by handle.
    pub fn node(&self, id: NodeId) -> &PartitionNode {
        &self.nodes[id.0]
    }

    /// Parent of `id`, `None` at the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Value where the interval of `id` begins.
    pub fn boundary(&self, id: NodeId) -> &Real {
        &self.nodes[id.0].start
    }

    /// Number of nodes ever created; never decreases.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some((left, right)) = self.nodes[id.0].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }

    /// Leaves in value order with their absolute masses.
    pub fn leaves(&self) -> Vec<Leaf> {
        let mut leaves = Vec::new();
        let mut stack = vec![(self.root, Real::one())];
        while let Some((id, context)) = stack.pop() {
            let node = &self.nodes[id.0];
            let mass = &context * &node.mass;
            match node.children() {
                // right pushed first so the left subtree is visited first
                Some((left, right)) => {
                    stack.push((right, mass.clone()));
                    stack.push((left, mass));
                }
                None => leaves.push(Leaf {
                    start: node.start.clone(),
                    length: node.length.clone(),
                    mass,
                }),
            }
        }
        leaves
    }

    /// Replace the conditional masses of the two children of `id` with
    /// `left_mass` and `1 - left_mass`.
    pub fn set_split(&mut self, id: NodeId, left_mass: Real) -> Result<(), TreeError> {
        let (left, right) = self.nodes[id.0]
            .children()
            .ok_or(TreeError::NotInternal(id))?;
        if left_mass.is_negative() || left_mass > Real::one() {
            return Err(TreeError::InvalidMass(left_mass.to_f64()));
        }
        self.nodes[right.0].mass = left_mass.complement();
        self.nodes[left.0].mass = left_mass;
        Ok(())
    }

    /// Probability of `[lower, upper)`. Read-only: the partition is not
    /// refined at either edge.
    pub fn interval_mass(&self, lower: &Real, upper: &Real) -> Result<Real, TreeError> {
        Ok(self.cdf(upper)? - self.cdf(lower)?)
    }

    /// Verify links, interval tiling and mass normalisation for every node.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let tol = &self.tolerance;
        let root = &self.nodes[self.root.0];
        if root.parent.is_some() {
            return Err(TreeError::InvariantViolation(format!(
                "root {} has a parent",
                self.root
            )));
        }
        if !root.mass.approx_eq(&Real::one(), tol) {
            return Err(TreeError::InvariantViolation(format!(
                "root mass {} is not 1",
                root.mass
            )));
        }

        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.mass.is_negative() || node.mass > &Real::one() + tol {
                return Err(TreeError::InvariantViolation(format!(
                    "node {id} has mass {}",
                    node.mass
                )));
            }
            let Some((left, right)) = node.children() else {
                if node.left.is_some() || node.right.is_some() {
                    return Err(TreeError::InvariantViolation(format!(
                        "node {id} has a single child"
                    )));
                }
                continue;
            };
            let (l, r) = (&self.nodes[left.0], &self.nodes[right.0]);
            if l.parent != Some(id) || r.parent != Some(id) {
                return Err(TreeError::InvariantViolation(format!(
                    "children of {id} do not point back to it"
                )));
            }
            if !(&l.mass + &r.mass).approx_eq(&Real::one(), tol) {
                return Err(TreeError::InvariantViolation(format!(
                    "children of {id} carry mass {} + {}",
                    l.mass, r.mass
                )));
            }
            if !(&l.length + &r.length).approx_eq(&node.length, tol) {
                return Err(TreeError::InvariantViolation(format!(
                    "children of {id} do not tile its length"
                )));
            }
            if !l.start.approx_eq(&node.start, tol) || !r.start.approx_eq(&l.end(), tol) {
                return Err(TreeError::InvariantViolation(format!(
                    "children of {id} are not adjacent"
                )));
            }
            stack.push(left);
            stack.push(right);
        }
        Ok(())
    }

    /// Turn leaf `id` into an internal node with children
    /// `[start, start + left_length)` and the remainder.
    pub(crate) fn split_leaf(
        &mut self,
        id: NodeId,
        left_length: Real,
        left_mass: Real,
    ) -> (NodeId, NodeId) {
        debug_assert!(self.nodes[id.0].is_leaf(), "only leaves are split");
        let start = self.nodes[id.0].start.clone();
        let right_length = &self.nodes[id.0].length - &left_length;
        let right_start = &start + &left_length;
        let right_mass = left_mass.complement();

        let left = self.push(PartitionNode::new(start, left_length, left_mass), id);
        let right = self.push(PartitionNode::new(right_start, right_length, right_mass), id);
        let parent = &mut self.nodes[id.0];
        parent.left = Some(left);
        parent.right = Some(right);
        tracing::trace!(node = %id, %left, %right, "split leaf");
        (left, right)
    }

    fn push(&mut self, mut node: PartitionNode, parent: NodeId) -> NodeId {
        node.parent = Some(parent);
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

impl Default for PartitionTree {
    fn default() -> Self {
        Self::new()
    }
}
