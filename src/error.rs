//! Error types shared by every graph operation

use thiserror::Error;

use crate::graph::NodeId;
use crate::value::Value;

/// Result alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// Why an argument list could not be mapped onto a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindErrorKind {
    /// More positional arguments than parameters and no `*args` slot
    #[error("argument count {found} exceeds number of positional params ({expected})")]
    TooManyPositional { expected: usize, found: usize },

    /// A keyword names a parameter already bound by position
    #[error("duplicate argument for parameter: {0}")]
    DuplicateArgument(String),

    /// A keyword matches no parameter and there is no `**kwargs` slot
    #[error("unrecognized keyword argument: {0}")]
    UnrecognizedKeyword(String),
}

/// Errors raised while building, walking, binding or evaluating a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The reachable subgraph is not acyclic
    #[error("call graph contains a directed cycle through {node}")]
    Cycle { node: NodeId },

    /// A variable placeholder's name is absent from the environment
    #[error("variable with name '{name}' not bound")]
    UnboundVariable { name: String },

    /// No literal key of a mapping constructor matched the index
    #[error("key not found: {key}")]
    KeyNotFound { key: Value },

    /// Arguments could not be bound to the callee's parameters
    #[error("cannot bind arguments of {function}: {kind}")]
    ArgumentBinding {
        function: String,
        kind: BindErrorKind,
    },

    /// A special node shape is malformed
    #[error("malformed node: {message}")]
    Construction { message: String },

    /// A node id does not belong to the graph
    #[error("unknown node {0}")]
    NodeNotFound(NodeId),

    /// An integer index fell outside a sequence
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// A primitive operation rejected its operands
    #[error("{op}: {message}")]
    Operation { op: &'static str, message: String },

    /// Evaluation nested deeper than the configured limit
    #[error("evaluation exceeded maximum depth of {limit}")]
    DepthExceeded { limit: usize },

    /// Error returned by a native function, passed through untouched
    #[error(transparent)]
    Function(#[from] anyhow::Error),
}

impl GraphError {
    /// Shorthand for a [`GraphError::Construction`] error.
    pub(crate) fn construction(message: impl Into<String>) -> Self {
        GraphError::Construction {
            message: message.into(),
        }
    }
}
