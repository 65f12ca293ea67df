//! Arena node of the partition tree
//!
//! Node = half-open interval [start, start + length) of the value axis
//! plus the probability of that interval conditioned on the parent.
//! Links are arena indices, so rotations only reassign indices.

use std::fmt;

use crate::numeric::Real;

/// Stable handle of a node inside a [`PartitionTree`](super::PartitionTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which child slot a node occupies under its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left child (lower values).
    Left,
    /// Right child (higher values).
    Right,
}

/// Tree node: interval, conditional mass and links.
#[derive(Debug, Clone)]
pub struct PartitionNode {
    pub(crate) start: Real,
    pub(crate) length: Real,
    pub(crate) mass: Real,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
}

impl PartitionNode {
    pub(crate) fn new(start: Real, length: Real, mass: Real) -> Self {
        Self {
            start,
            length,
            mass,
            parent: None,
            left: None,
            right: None,
        }
    }

    /// Lower edge of the interval (inclusive).
    pub fn start(&self) -> &Real {
        &self.start
    }

    /// Width of the interval.
    pub fn length(&self) -> &Real {
        &self.length
    }

    /// Upper edge of the interval (exclusive).
    pub fn end(&self) -> Real {
        &self.start + &self.length
    }

    /// Probability of this interval given the parent's interval.
    pub fn mass(&self) -> &Real {
        &self.mass
    }

    /// Parent handle, `None` at the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Left child handle.
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    /// Right child handle.
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// Both children of an internal node.
    #[inline]
    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match (self.left, self.right) {
            (Some(left), Some(right)) => Some((left, right)),
            _ => None,
        }
    }

    /// Leaves have no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

impl fmt::Display for PartitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}) p={:.6}",
            self.start,
            self.end(),
            self.mass
        )
    }
}
