//! Graph nodes
//!
//! Every node is one of a closed set of kinds decided at construction time.
//! All kinds share one child layout (positional `args` followed by keyword
//! `kwargs`), so traversal never needs to know which kind it is walking.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::fmt;

use super::node_id::NodeId;
use crate::function::{Callable, Op};
use crate::value::{SequenceKind, Value};

/// Kind of a graph node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A terminal holding an opaque value
    Literal(Value),

    /// Application of a callable to the node's arguments
    Call(Callable),

    /// List or tuple constructor; the args are the elements
    Sequence(SequenceKind),

    /// Mapping constructor; `args[0]` is the class literal, the rest are
    /// `(key, value)` pair nodes with literal keys first
    Mapping,

    /// Variable placeholder; `kwargs` holds its metadata
    Variable,

    /// Pick-one-of-N wrapper around a lookup in a mapping constructor
    Choice,
}

impl NodeKind {
    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, NodeKind::Literal(_))
    }

    /// Human readable name of the node's callee.
    pub fn label(&self) -> String {
        match self {
            NodeKind::Literal(_) => "literal".to_string(),
            NodeKind::Call(callable) => callable.name().to_string(),
            NodeKind::Sequence(SequenceKind::List) => "make_list".to_string(),
            NodeKind::Sequence(SequenceKind::Tuple) => "make_tuple".to_string(),
            NodeKind::Mapping => "make_mapping".to_string(),
            NodeKind::Variable => "variable".to_string(),
            NodeKind::Choice => "choice".to_string(),
        }
    }
}

/// A node in the expression graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Identity of this node in its graph
    id: NodeId,

    /// What the node computes
    kind: NodeKind,

    /// Positional argument nodes
    args: Vec<NodeId>,

    /// Keyword argument nodes, in insertion order
    kwargs: IndexMap<String, NodeId>,
}

impl Node {
    #[inline]
    pub(crate) fn new(
        id: NodeId,
        kind: NodeKind,
        args: Vec<NodeId>,
        kwargs: IndexMap<String, NodeId>,
    ) -> Self {
        Self { id, kind, args, kwargs }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn args(&self) -> &[NodeId] {
        &self.args
    }

    #[inline]
    pub fn kwargs(&self) -> &IndexMap<String, NodeId> {
        &self.kwargs
    }

    #[inline]
    pub fn kwarg(
        &self,
        name: &str,
    ) -> Option<NodeId> {
        self.kwargs.get(name).copied()
    }

    /// Literal payload, if this is a Literal.
    #[inline]
    pub fn literal(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn callable(&self) -> Option<&Callable> {
        match &self.kind {
            NodeKind::Call(callable) => Some(callable),
            _ => None,
        }
    }

    /// Every child: positional args first, then keyword values.
    pub fn inputs(&self) -> SmallVec<[NodeId; 4]> {
        self.args.iter().chain(self.kwargs.values()).copied().collect()
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        self.kind.is_literal()
    }

    #[inline]
    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(_))
    }

    #[inline]
    pub fn is_tuple(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(SequenceKind::Tuple))
    }

    #[inline]
    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping)
    }

    #[inline]
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, NodeKind::Variable)
    }

    #[inline]
    pub fn is_choice(&self) -> bool {
        matches!(self.kind, NodeKind::Choice)
    }

    #[inline]
    pub fn is_get_item(&self) -> bool {
        matches!(self.kind, NodeKind::Call(Callable::Op(Op::GetItem)))
    }

    /// Whether this is a two-element tuple, the shape of mapping entries.
    #[inline]
    pub fn is_pair(&self) -> bool {
        self.is_tuple() && self.args.len() == 2 && self.kwargs.is_empty()
    }

    pub(crate) fn push_arg(
        &mut self,
        arg: NodeId,
    ) {
        self.args.push(arg);
    }
}

impl fmt::Display for Node {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.kind {
            NodeKind::Literal(value) => write!(f, "Literal({}: {})", self.id.0, value),
            kind => write!(
                f,
                "Node({}: {}, {} args, {} kwargs)",
                self.id.0,
                kind.label(),
                self.args.len(),
                self.kwargs.len()
            ),
        }
    }
}
