//! Node identity
//!
//! A node's identity is its position in the owning [`Graph`](super::Graph)
//! arena. Two nodes built separately always get different ids, even when
//! they hold equal payloads.

use std::fmt;

/// Index of a node inside its graph.
///
/// Memoisation, sharing and cycle detection are all keyed by `NodeId`,
/// never by the content of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new NodeId with the given value.
    ///
    /// # Examples
    ///
    /// ```
    /// use searchspaces::graph::NodeId;
    ///
    /// let id = NodeId::new(42);
    /// assert_eq!(id.index(), 42);
    /// ```
    #[inline]
    pub fn new(value: usize) -> Self {
        NodeId(value)
    }

    /// Returns the arena index of the node.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}
