//! Deferred-evaluation expression graphs for hyperparameter search spaces
//!
//! A search space is described as a graph of lazily evaluated expressions:
//! literals, calls, list/tuple/mapping constructors, named variable
//! placeholders and choices between alternatives. An optimiser inspects the
//! graph (traversal, topological order, variables, argument binding), picks
//! values for the variables, and evaluates the graph against them.
//!
//! # Example
//!
//! ```
//! use searchspaces::eval::{evaluate, Environment};
//! use searchspaces::graph::{Domain, Graph, Term, VariableSpec};
//! use searchspaces::value::Value;
//!
//! let mut graph = Graph::new();
//! let lr = graph
//!     .variable(VariableSpec::new("lr", Domain::Float).minimum(1e-4).maximum(1.0))
//!     .unwrap();
//! let scaled = graph.mul(lr, 10).unwrap();
//! let space = graph
//!     .convert(Term::dict([(Term::from("lr"), Term::from(scaled))]))
//!     .unwrap();
//!
//! let env = Environment::new().with("lr", 0.5);
//! let value = evaluate(&graph, space, &env).unwrap();
//! assert_eq!(value.to_string(), "{'lr': 5.0}");
//! ```

#![warn(rust_2018_idioms)]

pub mod bind;
pub mod error;
pub mod eval;
pub mod function;
pub mod graph;
pub mod util;
pub mod value;

// Re-exports
pub use bind::{Binding, Bound, Signature};
pub use error::{BindErrorKind, GraphError, Result};
pub use eval::{evaluate, Environment, Evaluator, Invoke};
pub use function::{Callable, Function, Op};
pub use graph::{Deferred, Domain, Graph, Node, NodeId, NodeKind, Term, VariableSpec};
pub use value::{Mapping, MappingKind, Object, SequenceKind, Slice, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
