//! Lazy item lookup into constructor nodes
//!
//! Only the index and the selected elements are evaluated. Elements that
//! are not selected never run, which matters when they call functions with
//! side effects.

use tracing::trace;

use super::{Evaluator, Step};
use crate::error::{GraphError, Result};
use crate::function::normalize_index;
use crate::graph::{Node, NodeKind};
use crate::value::Value;

impl Evaluator<'_> {
    /// One step of an indexable `getitem` node whose children sit at `level`.
    pub(super) fn lazy_index(
        &mut self,
        node: &Node,
        level: usize,
    ) -> Result<Step> {
        let graph = self.graph;
        let container = graph.node(node.args()[0])?;
        let index_node = node.args()[1];
        let Some(index) = self.ready(index_node, level)? else {
            return Ok(Step::Need(vec![index_node]));
        };

        match container.kind() {
            NodeKind::Sequence(kind) => {
                let items = container.args();
                match &index {
                    Value::Int(_) | Value::Bool(_) => {
                        let i = normalize_index(index.as_int().unwrap_or_default(), items.len())?;
                        trace!(container = %container.id(), element = i, "lazy index");
                        Ok(Step::or_need(self.ready(items[i], level)?, items[i]))
                    }
                    Value::Slice(slice) => {
                        let picked = slice.indices(items.len())?;
                        trace!(container = %container.id(), elements = picked.len(), "lazy slice");
                        let mut missing = Vec::new();
                        let values = self.gather(picked.into_iter().map(|i| items[i]), level, &mut missing)?;
                        if !missing.is_empty() {
                            return Ok(Step::Need(missing));
                        }
                        Ok(Step::Done(kind.assemble(values)))
                    }
                    other => Err(GraphError::Operation {
                        op: "getitem",
                        message: format!("indices must be integers or slices, not {}", other.type_name()),
                    }),
                }
            }
            _ => self.lookup(container, &index, level),
        }
    }

    /// Scan the literal-keyed entries of a mapping constructor until a key
    /// equals `index`, then evaluate only its value.
    fn lookup(
        &mut self,
        mapping: &Node,
        index: &Value,
        level: usize,
    ) -> Result<Step> {
        let graph = self.graph;
        let mut computed_keys = false;
        for pair in &mapping.args()[1..] {
            let pair = graph.node(*pair)?;
            if !pair.is_pair() {
                return Err(GraphError::construction(format!(
                    "mapping entry {} is not a (key, value) pair",
                    pair.id()
                )));
            }
            let (key, value) = (pair.args()[0], pair.args()[1]);
            if !graph[key].is_literal() {
                computed_keys = true;
                continue;
            }
            if self.ready(key, level)?.as_ref() == Some(index) {
                trace!(container = %mapping.id(), entry = %pair.id(), "lazy lookup");
                return Ok(Step::or_need(self.ready(value, level)?, value));
            }
        }

        if computed_keys {
            Err(GraphError::construction(format!(
                "no literal key of mapping {} matches {}; computed keys cannot be matched lazily",
                mapping.id(),
                index.repr()
            )))
        } else {
            Err(GraphError::KeyNotFound { key: index.clone() })
        }
    }
}
