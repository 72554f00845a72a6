//! Memoized evaluation
//!
//! [`Evaluator`] computes the value of a node by evaluating its children
//! first. Results are memoized by [`NodeId`], so a node shared by several
//! parents is computed once and every parent receives the same value (for
//! [`Value::Object`] the very same object).
//!
//! Two shapes are special-cased:
//!
//! - a variable placeholder evaluates to its binding in the [`Environment`]
//! - an item lookup into a list, tuple or mapping constructor evaluates only
//!   the selected elements (see [`Graph::is_indexable`])

mod lazy;

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::error::{GraphError, Result};
use crate::function::Callable;
use crate::graph::{Graph, Node, NodeId, NodeKind};
use crate::util::config::EvalConfig;
use crate::value::{Mapping, Value};

/// Variable name to value bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
}

impl Environment {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, returning the previous value if there was one.
    pub fn bind(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.bindings.insert(name.into(), value.into())
    }

    /// Builder form of [`Environment::bind`].
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.bind(name, value);
        self
    }

    #[inline]
    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.bindings.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Hook through which every general call node is invoked.
///
/// Sequence, mapping, variable and choice nodes and lazy lookups never go
/// through the hook.
pub trait Invoke {
    fn invoke(
        &self,
        node: NodeId,
        callable: &Callable,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> Result<Value>;
}

/// Invokes the callable directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInvoke;

impl Invoke for DirectInvoke {
    #[inline]
    fn invoke(
        &self,
        _node: NodeId,
        callable: &Callable,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> Result<Value> {
        callable.invoke(args, kwargs)
    }
}

impl<F> Invoke for F
where
    F: Fn(NodeId, &Callable, &[Value], &IndexMap<String, Value>) -> Result<Value>,
{
    fn invoke(
        &self,
        node: NodeId,
        callable: &Callable,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> Result<Value> {
        self(node, callable, args, kwargs)
    }
}

/// Evaluates nodes of one graph against one environment.
///
/// The memo table lives as long as the evaluator, so evaluating several
/// roots with the same evaluator shares work between them.
///
/// Nodes are computed from an explicit worklist rather than by recursion,
/// so nesting is bounded by [`EvalConfig::max_depth`] and not by the size of
/// the thread's stack.
pub struct Evaluator<'g> {
    graph: &'g Graph,
    env: &'g Environment,
    config: EvalConfig,
    invoker: Box<dyn Invoke + 'g>,
    memo: HashMap<NodeId, Value>,
}

/// A node waiting on the worklist. The root sits at level 1.
#[derive(Debug, Clone, Copy)]
struct Frame {
    id: NodeId,
    level: usize,
}

/// Outcome of one attempt at computing a node.
enum Step {
    Done(Value),
    /// Children to evaluate before the node is tried again.
    Need(Vec<NodeId>),
}

impl Step {
    fn or_need(
        value: Option<Value>,
        id: NodeId,
    ) -> Self {
        match value {
            Some(value) => Step::Done(value),
            None => Step::Need(vec![id]),
        }
    }
}

impl<'g> Evaluator<'g> {
    pub fn new(
        graph: &'g Graph,
        env: &'g Environment,
    ) -> Self {
        Self {
            graph,
            env,
            config: EvalConfig::default(),
            invoker: Box::new(DirectInvoke),
            memo: HashMap::new(),
        }
    }

    pub fn with_config(
        mut self,
        config: EvalConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn with_invoker(
        mut self,
        invoker: impl Invoke + 'g,
    ) -> Self {
        self.invoker = Box::new(invoker);
        self
    }

    /// Number of nodes evaluated so far.
    #[inline]
    pub fn evaluated(&self) -> usize {
        self.memo.len()
    }

    /// Whether `id` has already been evaluated.
    #[inline]
    pub fn is_evaluated(
        &self,
        id: NodeId,
    ) -> bool {
        self.memo.contains_key(&id)
    }

    /// Evaluate `root`.
    ///
    /// # Errors
    ///
    /// - `GraphError::UnboundVariable` for a variable missing from the
    ///   environment
    /// - `GraphError::KeyNotFound` for a failed lazy mapping lookup
    /// - `GraphError::DepthExceeded` when nesting exceeds the configured limit
    /// - any error returned by an invoked callable, unchanged
    pub fn evaluate(
        &mut self,
        root: NodeId,
    ) -> Result<Value> {
        debug!("evaluating {} with {} bindings", root, self.env.len());
        if let Some(value) = self.memo.get(&root) {
            return Ok(value.clone());
        }
        self.check_level(1)?;

        let mut stack = vec![Frame { id: root, level: 1 }];
        while let Some(&Frame { id, level }) = stack.last() {
            if self.memo.contains_key(&id) {
                stack.pop();
                continue;
            }
            match self.step(id, level)? {
                Step::Done(value) => {
                    trace!(node = %id, level, "evaluated");
                    self.memo.insert(id, value);
                    stack.pop();
                }
                Step::Need(children) => {
                    self.check_level(level + 1)?;
                    // reversed, so the first child is computed first
                    stack.extend(children.into_iter().rev().map(|id| Frame { id, level: level + 1 }));
                }
            }
        }

        self.memo.get(&root).cloned().ok_or(GraphError::NodeNotFound(root))
    }

    fn check_level(
        &self,
        level: usize,
    ) -> Result<()> {
        if level > self.config.max_depth {
            return Err(GraphError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        Ok(())
    }

    /// The value of `id` when it needs no further work: already memoized,
    /// or a literal.
    fn ready(
        &mut self,
        id: NodeId,
        level: usize,
    ) -> Result<Option<Value>> {
        if let Some(value) = self.memo.get(&id) {
            return Ok(Some(value.clone()));
        }
        let graph = self.graph;
        match graph.node(id)?.kind() {
            NodeKind::Literal(value) => {
                self.check_level(level)?;
                self.memo.insert(id, value.clone());
                Ok(Some(value.clone()))
            }
            _ => Ok(None),
        }
    }

    /// Values of the ready nodes among `ids`; the others go to `missing`.
    fn gather(
        &mut self,
        ids: impl IntoIterator<Item = NodeId>,
        level: usize,
        missing: &mut Vec<NodeId>,
    ) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        for id in ids {
            match self.ready(id, level)? {
                Some(value) => values.push(value),
                None => missing.push(id),
            }
        }
        Ok(values)
    }

    fn step(
        &mut self,
        id: NodeId,
        level: usize,
    ) -> Result<Step> {
        let graph = self.graph;
        let node = graph.node(id)?;
        let below = level + 1;

        match node.kind() {
            NodeKind::Literal(value) => Ok(Step::Done(value.clone())),
            NodeKind::Variable => self.substitute(node, below),
            _ if graph.is_indexable(id) => self.lazy_index(node, below),
            NodeKind::Sequence(kind) => {
                let mut missing = Vec::new();
                let items = self.gather(node.args().iter().copied(), below, &mut missing)?;
                if !missing.is_empty() {
                    return Ok(Step::Need(missing));
                }
                Ok(Step::Done(kind.assemble(items)))
            }
            NodeKind::Mapping => self.build_mapping(node, below),
            NodeKind::Choice => match node.args() {
                [lookup] => Ok(Step::or_need(self.ready(*lookup, below)?, *lookup)),
                _ => Err(GraphError::construction(format!(
                    "choice {} must have exactly one argument, has {}",
                    id,
                    node.args().len()
                ))),
            },
            NodeKind::Call(callable) => {
                let mut missing = Vec::new();
                let args = self.gather(node.args().iter().copied(), below, &mut missing)?;
                let values = self.gather(node.kwargs().values().copied(), below, &mut missing)?;
                if !missing.is_empty() {
                    return Ok(Step::Need(missing));
                }
                let kwargs: IndexMap<String, Value> = node.kwargs().keys().cloned().zip(values).collect();
                self.invoker.invoke(id, callable, &args, &kwargs).map(Step::Done)
            }
        }
    }

    /// Look a variable up by name. Only the name is evaluated.
    fn substitute(
        &mut self,
        node: &Node,
        level: usize,
    ) -> Result<Step> {
        let name_node = node
            .kwarg("name")
            .ok_or_else(|| GraphError::construction(format!("variable {} has no name", node.id())))?;
        let Some(name) = self.ready(name_node, level)? else {
            return Ok(Step::Need(vec![name_node]));
        };
        let name = match name {
            Value::Str(name) => name,
            other => {
                return Err(GraphError::construction(format!(
                    "variable name must be a string, got {}",
                    other.type_name()
                )));
            }
        };
        trace!(variable = %name, "substitute");
        self.env
            .get(&name)
            .cloned()
            .map(Step::Done)
            .ok_or_else(|| GraphError::UnboundVariable { name: name.to_string() })
    }

    fn build_mapping(
        &mut self,
        node: &Node,
        level: usize,
    ) -> Result<Step> {
        let (class, pairs) = node
            .args()
            .split_first()
            .ok_or_else(|| GraphError::construction(format!("mapping {} has no class", node.id())))?;
        let Some(class_value) = self.ready(*class, level)? else {
            return Ok(Step::Need(vec![*class]));
        };
        let kind = match class_value {
            Value::MappingClass(kind) => kind,
            other => {
                return Err(GraphError::construction(format!(
                    "mapping class must be a mapping type, got {}",
                    other
                )));
            }
        };

        let mut missing = Vec::new();
        let entries = self.gather(pairs.iter().copied(), level, &mut missing)?;
        if !missing.is_empty() {
            return Ok(Step::Need(missing));
        }

        let mut mapping = Mapping::new(kind);
        for (pair, entry) in pairs.iter().zip(entries) {
            let entry = match entry {
                Value::Tuple(entry) => <[Value; 2]>::try_from(entry).ok(),
                _ => None,
            };
            let [key, value] = entry.ok_or_else(|| {
                GraphError::construction(format!("mapping entry {} is not a (key, value) pair", pair))
            })?;
            mapping.insert(key, value);
        }
        Ok(Step::Done(Value::Map(mapping)))
    }
}

/// Evaluate `root` against `env` with a fresh evaluator.
///
/// # Examples
///
/// ```
/// use searchspaces::eval::{evaluate, Environment};
/// use searchspaces::graph::Graph;
/// use searchspaces::value::Value;
///
/// let mut graph = Graph::new();
/// let sum = graph.add(2, 3).unwrap();
/// let product = graph.mul(sum, 4).unwrap();
/// assert_eq!(evaluate(&graph, product, &Environment::new()).unwrap(), Value::Int(20));
/// ```
pub fn evaluate(
    graph: &Graph,
    root: NodeId,
    env: &Environment,
) -> Result<Value> {
    Evaluator::new(graph, env).evaluate(root)
}

#[cfg(test)]
mod tests;
