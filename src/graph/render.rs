//! One-line textual rendering of an expression
//!
//! A node referenced from more than one place is written out in full the
//! first time, tagged `@<id>=`, and as `@<id>` afterwards.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

use super::{Graph, Node, NodeId, NodeKind};
use crate::error::{GraphError, Result};
use crate::function::Callable;
use crate::value::{MappingKind, SequenceKind, Value};

/// Output still to be written. The worklist holds pieces in reverse order.
enum Piece<'g> {
    Text(Cow<'g, str>),
    Node(NodeId),
}

impl<'g> Piece<'g> {
    #[inline]
    fn text(text: impl Into<Cow<'g, str>>) -> Self {
        Piece::Text(text.into())
    }
}

struct Renderer<'g> {
    graph: &'g Graph,
    shared: HashSet<NodeId>,
    seen: HashSet<NodeId>,
    pending: Vec<Piece<'g>>,
    out: String,
}

impl<'g> Renderer<'g> {
    fn run(
        mut self,
        root: NodeId,
    ) -> Result<String, fmt::Error> {
        self.pending.push(Piece::Node(root));
        while let Some(piece) = self.pending.pop() {
            match piece {
                Piece::Text(text) => self.out.push_str(&text),
                Piece::Node(id) => self.expand(id)?,
            }
        }
        Ok(self.out)
    }

    /// Replace a node by the pieces it is written as.
    fn expand(
        &mut self,
        id: NodeId,
    ) -> fmt::Result {
        if self.shared.contains(&id) {
            if !self.seen.insert(id) {
                return write!(self.out, "@{}", id.0);
            }
            write!(self.out, "@{}=", id.0)?;
        }

        let graph = self.graph;
        let node = &graph[id];
        let mut parts: Vec<Piece<'g>> = Vec::new();
        match node.kind() {
            NodeKind::Literal(value) => parts.push(Piece::text(value.repr())),
            NodeKind::Sequence(SequenceKind::List) => {
                parts.push(Piece::text("["));
                items(&mut parts, node.args());
                parts.push(Piece::text("]"));
            }
            NodeKind::Sequence(SequenceKind::Tuple) => {
                parts.push(Piece::text("("));
                items(&mut parts, node.args());
                if node.args().len() == 1 {
                    parts.push(Piece::text(","));
                }
                parts.push(Piece::text(")"));
            }
            NodeKind::Mapping => mapping(graph, &mut parts, node),
            NodeKind::Variable => match node.kwarg("name").and_then(|n| graph.literal_value(n)) {
                Some(Value::Str(name)) => parts.push(Piece::text(format!("${}", name))),
                _ => call(&mut parts, "variable", node),
            },
            NodeKind::Choice => call(&mut parts, "choice", node),
            NodeKind::Call(Callable::Op(op)) if node.kwargs().is_empty() => match (op.symbol(), node.args()) {
                (Some(symbol), [a]) if op.is_unary() => {
                    parts.extend([Piece::text(symbol), Piece::Node(*a)]);
                }
                (Some(symbol), [a, b]) => parts.extend([
                    Piece::text("("),
                    Piece::Node(*a),
                    Piece::text(format!(" {} ", symbol)),
                    Piece::Node(*b),
                    Piece::text(")"),
                ]),
                (None, [container, index]) if node.is_get_item() => parts.extend([
                    Piece::Node(*container),
                    Piece::text("["),
                    Piece::Node(*index),
                    Piece::text("]"),
                ]),
                _ => call(&mut parts, op.name(), node),
            },
            NodeKind::Call(callable) => call(&mut parts, callable.name(), node),
        }
        self.pending.extend(parts.into_iter().rev());
        Ok(())
    }
}

fn items<'g>(
    parts: &mut Vec<Piece<'g>>,
    ids: &[NodeId],
) {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            parts.push(Piece::text(", "));
        }
        parts.push(Piece::Node(*id));
    }
}

fn call<'g>(
    parts: &mut Vec<Piece<'g>>,
    name: &'g str,
    node: &'g Node,
) {
    parts.push(Piece::text(name));
    parts.push(Piece::text("("));
    items(parts, node.args());
    for (i, (key, value)) in node.kwargs().iter().enumerate() {
        if i > 0 || !node.args().is_empty() {
            parts.push(Piece::text(", "));
        }
        parts.push(Piece::text(key.as_str()));
        parts.push(Piece::text("="));
        parts.push(Piece::Node(*value));
    }
    parts.push(Piece::text(")"));
}

fn mapping<'g>(
    graph: &'g Graph,
    parts: &mut Vec<Piece<'g>>,
    node: &'g Node,
) {
    let ordered = matches!(
        node.args().first().and_then(|c| graph.literal_value(*c)),
        Some(Value::MappingClass(MappingKind::Ordered))
    );
    let pairs = node.args().get(1..).unwrap_or_default();
    if !pairs.iter().all(|p| graph[*p].is_pair()) {
        return call(parts, "make_mapping", node);
    }

    if ordered {
        parts.push(Piece::text("OrderedDict("));
    }
    parts.push(Piece::text("{"));
    for (i, pair) in pairs.iter().enumerate() {
        if i > 0 {
            parts.push(Piece::text(", "));
        }
        let entry = graph[*pair].args();
        parts.extend([Piece::Node(entry[0]), Piece::text(": "), Piece::Node(entry[1])]);
    }
    parts.push(Piece::text("}"));
    if ordered {
        parts.push(Piece::text(")"));
    }
}

impl Graph {
    /// Render the expression rooted at `root` on one line.
    ///
    /// # Errors
    ///
    /// `GraphError::Cycle` if a cycle is reachable from `root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use searchspaces::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let x = graph.add(3, 4).unwrap();
    /// let y = graph.mul(x, x).unwrap();
    /// assert_eq!(graph.render(y).unwrap(), "(@2=(3 + 4) * @2)");
    /// ```
    pub fn render(
        &self,
        root: NodeId,
    ) -> Result<String> {
        let order = super::depth_first(self, root)?;
        let mut references: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
        for id in &order {
            for child in self[*id].inputs() {
                *references.entry(child).or_default() += 1;
            }
        }
        let shared = references.into_iter().filter(|(_, n)| *n > 1).map(|(id, _)| id).collect();

        let renderer = Renderer {
            graph: self,
            shared,
            seen: HashSet::new(),
            pending: Vec::new(),
            out: String::new(),
        };
        renderer
            .run(root)
            .map_err(|_| GraphError::construction(format!("cannot render {}", root)))
    }
}
