//! Deferred-evaluation expression graph
//!
//! This module provides the arena that owns every node, the builder that
//! turns nested values and deferred calls into nodes, and the traversal
//! algorithms used by evaluation and by anything that exports a graph.
//!
//! # Architecture
//!
//! - [`NodeId`](node_id::NodeId) - Identity of a node (its arena index)
//! - [`Node`](node::Node) - A single node and its children
//! - [`NodeKind`](node::NodeKind) - The closed set of node shapes
//! - [`Graph`] - The arena; all construction goes through it
//! - [`Term`](builder::Term) - Builder input: nested values, nodes and deferred calls
//! - [`depth_first`](traversal::depth_first) / [`topological`](traversal::topological) - Ordered walks with cycle detection

pub mod builder;
pub mod node;
pub mod node_id;
mod ops;
mod render;
pub mod traversal;

pub use builder::{Deferred, Domain, Term, VariableInfo, VariableSpec};
pub use node::{Node, NodeKind};
pub use node_id::NodeId;
pub use traversal::{depth_first, topological, DepthFirst, Traversal};

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

use crate::bind::Signature;
use crate::error::{GraphError, Result};
use crate::function::Callable;
use crate::value::{SequenceKind, Value};

/// Arena owning the nodes of one or more expression graphs.
///
/// A node may only reference nodes that already exist when it is created,
/// so construction alone never produces a cycle. [`Graph::append_arg`] is
/// the one mutation allowed afterwards; graphs assembled with it are
/// checked for cycles whenever they are traversed.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Create a new empty graph.
    ///
    /// # Examples
    ///
    /// ```
    /// use searchspaces::graph::Graph;
    ///
    /// let graph = Graph::new();
    /// assert!(graph.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Create a new graph with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Add a node whose children must already exist.
    pub(crate) fn push(
        &mut self,
        kind: NodeKind,
        args: Vec<NodeId>,
        kwargs: IndexMap<String, NodeId>,
    ) -> Result<NodeId> {
        if let Some(missing) = args.iter().chain(kwargs.values()).find(|c| !self.contains(**c)) {
            return Err(GraphError::NodeNotFound(*missing));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, kind, args, kwargs));
        Ok(id)
    }

    /// Add a Literal node.
    ///
    /// # Examples
    ///
    /// ```
    /// use searchspaces::graph::Graph;
    /// use searchspaces::value::Value;
    ///
    /// let mut graph = Graph::new();
    /// let a = graph.literal(5);
    /// let b = graph.literal(5);
    /// assert_ne!(a, b);
    /// assert_eq!(graph.literal_value(a), Some(&Value::Int(5)));
    /// ```
    pub fn literal(
        &mut self,
        value: impl Into<Value>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(id, NodeKind::Literal(value.into()), Vec::new(), IndexMap::new()));
        id
    }

    /// Add a call node over existing argument nodes.
    pub fn apply(
        &mut self,
        callable: impl Into<Callable>,
        args: Vec<NodeId>,
        kwargs: IndexMap<String, NodeId>,
    ) -> Result<NodeId> {
        self.push(NodeKind::Call(callable.into()), args, kwargs)
    }

    /// Add a list or tuple constructor over existing element nodes.
    pub fn sequence(
        &mut self,
        kind: SequenceKind,
        items: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.push(NodeKind::Sequence(kind), items, IndexMap::new())
    }

    /// Append a trailing positional argument to an existing node.
    ///
    /// This is the only mutation a node supports, and is meant for graph
    /// assembly. It can introduce a cycle; traversal reports it.
    pub fn append_arg(
        &mut self,
        node: NodeId,
        arg: NodeId,
    ) -> Result<()> {
        if !self.contains(arg) {
            return Err(GraphError::NodeNotFound(arg));
        }
        let target = self.nodes.get_mut(node.0).ok_or(GraphError::NodeNotFound(node))?;
        if target.is_literal() {
            return Err(GraphError::construction(format!("cannot append an argument to literal {}", node)));
        }
        target.push_arg(arg);
        Ok(())
    }

    #[inline]
    pub fn contains(
        &self,
        id: NodeId,
    ) -> bool {
        id.0 < self.nodes.len()
    }

    #[inline]
    pub fn get(
        &self,
        id: NodeId,
    ) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    #[inline]
    pub fn node(
        &self,
        id: NodeId,
    ) -> Result<&Node> {
        self.get(id).ok_or(GraphError::NodeNotFound(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Payload of a Literal node; `None` for anything else.
    #[inline]
    pub fn literal_value(
        &self,
        id: NodeId,
    ) -> Option<&Value> {
        self.get(id).and_then(Node::literal)
    }

    /// Children of a node: positional args, then keyword values.
    pub fn inputs(
        &self,
        id: NodeId,
    ) -> Result<SmallVec<[NodeId; 4]>> {
        Ok(self.node(id)?.inputs())
    }

    /// Whether `id` is an item lookup the evaluator can perform lazily:
    /// `getitem` with exactly a container and an index, no keywords, and a
    /// sequence or mapping constructor as the container.
    pub fn is_indexable(
        &self,
        id: NodeId,
    ) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        if !node.is_get_item() || node.args().len() != 2 || !node.kwargs().is_empty() {
            return false;
        }
        self.get(node.args()[0])
            .map(|container| container.is_sequence() || self.is_mapping_constructor(container))
            .unwrap_or(false)
    }

    /// A Mapping node whose first argument is the class literal.
    pub(crate) fn is_mapping_constructor(
        &self,
        node: &Node,
    ) -> bool {
        node.is_mapping()
            && node
                .args()
                .first()
                .and_then(|class| self.literal_value(*class))
                .is_some_and(|v| matches!(v, Value::MappingClass(_)))
    }

    /// Signature of the callee behind `id`.
    pub fn signature_of(
        &self,
        id: NodeId,
    ) -> Result<Signature> {
        Ok(match self.node(id)?.kind() {
            NodeKind::Literal(_) => {
                return Err(GraphError::construction(format!("literal {} has no signature", id)));
            }
            NodeKind::Call(callable) => callable.signature(),
            NodeKind::Sequence(_) => Signature::default().with_varargs("args"),
            NodeKind::Mapping => Signature::new(["f"]).with_varargs("args"),
            NodeKind::Variable => Signature::any(),
            NodeKind::Choice => Signature::new(["v"]),
        })
    }

    /// Copy every node reachable from `root` into fresh nodes and return the
    /// copy of `root`. Sharing inside the subgraph is preserved.
    pub fn clone_subgraph(
        &mut self,
        root: NodeId,
    ) -> Result<NodeId> {
        let order = topological(self, root)?;
        let mut copies: HashMap<NodeId, NodeId> = HashMap::with_capacity(order.len());
        for id in order.into_iter().rev() {
            let node = self.node(id)?.clone();
            let remap = |c: &NodeId| copies.get(c).copied().ok_or(GraphError::NodeNotFound(*c));
            let args = node.args().iter().map(remap).collect::<Result<Vec<_>>>()?;
            let kwargs = node
                .kwargs()
                .iter()
                .map(|(k, v)| Ok((k.clone(), remap(v)?)))
                .collect::<Result<IndexMap<_, _>>>()?;
            let copy = self.push(node.kind().clone(), args, kwargs)?;
            copies.insert(id, copy);
        }
        copies.get(&root).copied().ok_or(GraphError::NodeNotFound(root))
    }
}

impl std::ops::Index<NodeId> for Graph {
    type Output = Node;

    fn index(
        &self,
        id: NodeId,
    ) -> &Node {
        &self.nodes[id.0]
    }
}

impl fmt::Display for Graph {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Graph {{")?;
        for node in &self.nodes {
            writeln!(f, "  {}", node)?;
        }
        write!(f, "}}")
    }
}
