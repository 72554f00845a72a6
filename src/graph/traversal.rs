//! Depth-first traversal and topological ordering
//!
//! Both walks run on an explicit stack. Besides the set of nodes already
//! yielded, the walk keeps the chain of currently open ancestors; meeting a
//! node that is already on that chain is a cycle. A shared node reached
//! along a second path is not a cycle, it is simply not yielded again.

use indexmap::{IndexMap, IndexSet};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use super::{Graph, NodeId};
use crate::error::{GraphError, Result};

/// Lazy depth-first walk from a root.
///
/// Yields every reachable node exactly once, parents before the children
/// first reached through them. A cycle is reported as an `Err` item, after
/// which the iterator is exhausted.
pub struct DepthFirst<'g> {
    graph: &'g Graph,
    /// Pending `(parent, node)` frames; `None` is the root's virtual parent
    to_visit: Vec<(Option<NodeId>, NodeId)>,
    /// Open ancestor chain of the frame being processed
    path: Vec<Option<NodeId>>,
    on_path: Vec<bool>,
    /// Every visited node with the distinct parents that reference it
    parents: IndexMap<NodeId, IndexSet<Option<NodeId>>>,
    done: bool,
}

impl<'g> DepthFirst<'g> {
    pub fn new(
        graph: &'g Graph,
        root: NodeId,
    ) -> Self {
        Self {
            graph,
            to_visit: vec![(None, root)],
            path: vec![None],
            on_path: vec![false; graph.len()],
            parents: IndexMap::new(),
            done: false,
        }
    }

    fn pop_until(
        &mut self,
        parent: Option<NodeId>,
    ) {
        while let Some(top) = self.path.last() {
            if *top == parent {
                break;
            }
            if let Some(id) = top {
                self.on_path[id.0] = false;
            }
            self.path.pop();
        }
    }

    fn step(&mut self) -> Result<Option<NodeId>> {
        let graph = self.graph;
        while let Some((parent, node)) = self.to_visit.pop() {
            let current = graph.node(node)?;
            self.pop_until(parent);
            if self.on_path[node.0] {
                return Err(GraphError::Cycle { node });
            }
            self.on_path[node.0] = true;
            self.path.push(Some(node));

            let first_visit = !self.parents.contains_key(&node);
            self.parents.entry(node).or_default().insert(parent);
            if first_visit {
                // Reverse so the first child is popped first.
                let children = current.inputs();
                self.to_visit.extend(children.iter().rev().map(|c| (Some(node), *c)));
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Run the walk to completion and return the visit order together with
    /// the inverted adjacency.
    pub fn finish(mut self) -> Result<Traversal> {
        let mut order = Vec::new();
        for id in self.by_ref() {
            order.push(id?);
        }
        let parents = self
            .parents
            .into_iter()
            .map(|(id, set)| {
                let set = set.into_iter().flatten().collect::<IndexSet<_>>();
                (id, set)
            })
            .collect();
        Ok(Traversal { order, parents })
    }
}

impl Iterator for DepthFirst<'_> {
    type Item = Result<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(id)) => Some(Ok(id)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Result of a complete walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    /// Nodes in depth-first order
    pub order: Vec<NodeId>,
    /// For every visited node, the distinct nodes that reference it; the
    /// root's set is empty
    pub parents: IndexMap<NodeId, IndexSet<NodeId>>,
}

/// All nodes reachable from `root` in depth-first order.
///
/// # Errors
///
/// `GraphError::Cycle` if a cycle is reachable from `root`.
///
/// # Examples
///
/// ```
/// use searchspaces::graph::{depth_first, Graph, Term};
///
/// let mut graph = Graph::new();
/// let list = graph.convert(Term::List(vec![1.into(), 2.into()])).unwrap();
/// let order = depth_first(&graph, list).unwrap();
/// assert_eq!(order[0], list);
/// assert_eq!(order.len(), 3);
/// ```
pub fn depth_first(
    graph: &Graph,
    root: NodeId,
) -> Result<Vec<NodeId>> {
    DepthFirst::new(graph, root).collect()
}

/// All nodes reachable from `root`, each after every node that references
/// it. The root comes first.
///
/// # Errors
///
/// `GraphError::Cycle` if a cycle is reachable from `root`.
pub fn topological(
    graph: &Graph,
    root: NodeId,
) -> Result<Vec<NodeId>> {
    let Traversal { order, parents } = DepthFirst::new(graph, root).finish()?;
    debug!("topological sort of {} nodes from {}", order.len(), root);

    let mut candidates: VecDeque<NodeId> = order.into();
    let mut emitted: HashSet<NodeId> = HashSet::with_capacity(candidates.len());
    let mut sorted = Vec::with_capacity(candidates.len());
    let mut stalled = 0;
    while let Some(proposed) = candidates.pop_front() {
        let ready = parents
            .get(&proposed)
            .map_or(true, |refs| refs.iter().all(|p| emitted.contains(p)));
        if ready {
            emitted.insert(proposed);
            sorted.push(proposed);
            stalled = 0;
        } else {
            candidates.push_back(proposed);
            stalled += 1;
            // A full round without progress means the parents never resolve.
            if stalled > candidates.len() {
                return Err(GraphError::Cycle { node: proposed });
            }
        }
    }
    Ok(sorted)
}

impl Graph {
    /// Lazy depth-first walk from `root`.
    #[inline]
    pub fn walk(
        &self,
        root: NodeId,
    ) -> DepthFirst<'_> {
        DepthFirst::new(self, root)
    }

    /// Variable placeholders reachable from `root`, in depth-first order.
    pub fn variables(
        &self,
        root: NodeId,
    ) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        for id in self.walk(root) {
            let id = id?;
            if self[id].is_variable() {
                found.push(id);
            }
        }
        Ok(found)
    }
}
