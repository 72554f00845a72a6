//! Graph construction
//!
//! [`Graph::convert`] turns a [`Term`] (nested lists, tuples, mappings,
//! scalars, existing nodes and deferred calls) into nodes. Existing nodes
//! pass through untouched, which is how sharing is expressed: placing the
//! same `NodeId` at two positions yields one node with two parents.

use indexmap::IndexMap;

use super::{Graph, NodeId, NodeKind};
use crate::error::{GraphError, Result};
use crate::function::{Callable, Op};
use crate::value::{MappingKind, Object, SequenceKind, Slice, Value};

/// Builder input.
#[derive(Debug, Clone)]
pub enum Term {
    /// An already built node, used as is
    Node(NodeId),
    /// A native value; lists, tuples and mappings are decomposed
    Value(Value),
    /// A value wrapped as a single Literal without looking inside it
    Literal(Value),
    List(Vec<Term>),
    Tuple(Vec<Term>),
    Map(MappingKind, Vec<(Term, Term)>),
    /// A deferred call
    Call(Deferred),
}

impl Term {
    #[inline]
    pub fn none() -> Self {
        Term::Value(Value::None)
    }

    /// A `dict` built from `(key, value)` pairs.
    pub fn dict(entries: impl IntoIterator<Item = (Term, Term)>) -> Self {
        Term::Map(MappingKind::Dict, entries.into_iter().collect())
    }

    /// Whether converting this term yields a Literal node.
    fn converts_to_literal(
        &self,
        graph: &Graph,
    ) -> bool {
        match self {
            Term::Literal(_) => true,
            Term::Value(v) => !matches!(v, Value::List(_) | Value::Tuple(_) | Value::Map(_)),
            Term::Node(id) => graph.literal_value(*id).is_some(),
            Term::List(_) | Term::Tuple(_) | Term::Map(..) | Term::Call(_) => false,
        }
    }
}

impl From<NodeId> for Term {
    fn from(id: NodeId) -> Self {
        Term::Node(id)
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Value(value)
    }
}

impl From<Deferred> for Term {
    fn from(call: Deferred) -> Self {
        Term::Call(call)
    }
}

macro_rules! term_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Term {
                fn from(v: $ty) -> Self {
                    Term::Value(Value::from(v))
                }
            }
        )*
    };
}

term_from_scalar!(bool, i32, i64, f64, &str, String, Slice, Object);

/// Description of a call whose evaluation is deferred: a target plus
/// positional and keyword arguments, each of which may be a raw value or a
/// node.
#[derive(Debug, Clone)]
pub struct Deferred {
    func: Callable,
    args: Vec<Term>,
    kwargs: IndexMap<String, Term>,
}

impl Deferred {
    pub fn new(func: impl Into<Callable>) -> Self {
        Self {
            func: func.into(),
            args: Vec::new(),
            kwargs: IndexMap::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(
        mut self,
        arg: impl Into<Term>,
    ) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set a keyword argument.
    pub fn kwarg(
        mut self,
        name: impl Into<String>,
        arg: impl Into<Term>,
    ) -> Self {
        self.kwargs.insert(name.into(), arg.into());
        self
    }
}

/// Domain of values a variable ranges over.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    Float,
    Int,
    /// A finite set of possible values
    Values(Vec<Value>),
}

impl Domain {
    fn to_value(&self) -> Value {
        match self {
            Domain::Float => Value::str("float"),
            Domain::Int => Value::str("int"),
            Domain::Values(values) => Value::Tuple(values.clone()),
        }
    }

    fn from_value(value: &Value) -> Option<Domain> {
        match value {
            Value::Str(s) if &**s == "float" => Some(Domain::Float),
            Value::Str(s) if &**s == "int" => Some(Domain::Int),
            Value::Tuple(values) | Value::List(values) => Some(Domain::Values(values.clone())),
            _ => None,
        }
    }
}

const STANDARD_KEYS: [&str; 7] = [
    "name",
    "value_type",
    "minimum",
    "maximum",
    "default",
    "log_scale",
    "distribution",
];

/// Declaration of a variable placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub domain: Domain,
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub default: Option<Value>,
    pub log_scale: bool,
    /// Prior over the domain, opaque to this crate
    pub distribution: Option<Value>,
    /// Additional metadata for optimisers
    pub extra: IndexMap<String, Value>,
}

impl VariableSpec {
    pub fn new(
        name: impl Into<String>,
        domain: Domain,
    ) -> Self {
        Self {
            name: name.into(),
            domain,
            minimum: None,
            maximum: None,
            default: None,
            log_scale: false,
            distribution: None,
            extra: IndexMap::new(),
        }
    }

    pub fn minimum(
        mut self,
        value: impl Into<Value>,
    ) -> Self {
        self.minimum = Some(value.into());
        self
    }

    pub fn maximum(
        mut self,
        value: impl Into<Value>,
    ) -> Self {
        self.maximum = Some(value.into());
        self
    }

    pub fn default_value(
        mut self,
        value: impl Into<Value>,
    ) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn log_scale(
        mut self,
        log_scale: bool,
    ) -> Self {
        self.log_scale = log_scale;
        self
    }

    pub fn distribution(
        mut self,
        value: impl Into<Value>,
    ) -> Self {
        self.distribution = Some(value.into());
        self
    }

    pub fn meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Metadata read back from a variable node.
pub type VariableInfo = VariableSpec;

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

impl Graph {
    /// Convert a term into a node.
    ///
    /// - an existing node is returned unchanged
    /// - a deferred call becomes a call node over converted arguments
    /// - a list or tuple becomes a sequence constructor of the same kind
    /// - a mapping becomes a mapping constructor whose literal-keyed pairs
    ///   come before computed-key pairs, otherwise in input order
    /// - anything else becomes a Literal
    ///
    /// # Examples
    ///
    /// ```
    /// use searchspaces::graph::{Graph, Term};
    ///
    /// let mut graph = Graph::new();
    /// let node = graph.convert(Term::Tuple(vec![6.into(), 9.into(), 4.into()])).unwrap();
    /// assert!(graph[node].is_tuple());
    /// assert_eq!(graph.convert(node).unwrap(), node);
    /// ```
    pub fn convert(
        &mut self,
        term: impl Into<Term>,
    ) -> Result<NodeId> {
        match term.into() {
            Term::Node(id) if self.contains(id) => Ok(id),
            Term::Node(id) => Err(GraphError::NodeNotFound(id)),
            Term::Literal(value) => Ok(self.literal(value)),
            Term::Value(Value::List(items)) => self.convert_sequence(SequenceKind::List, items.into_iter().map(Term::Value)),
            Term::Value(Value::Tuple(items)) => {
                self.convert_sequence(SequenceKind::Tuple, items.into_iter().map(Term::Value))
            }
            Term::Value(Value::Map(map)) => {
                let entries = map.iter().map(|(k, v)| (Term::Value(k.clone()), Term::Value(v.clone())));
                self.convert_mapping(map.kind(), entries.collect())
            }
            Term::Value(value) => Ok(self.literal(value)),
            Term::List(items) => self.convert_sequence(SequenceKind::List, items),
            Term::Tuple(items) => self.convert_sequence(SequenceKind::Tuple, items),
            Term::Map(kind, entries) => self.convert_mapping(kind, entries),
            Term::Call(deferred) => {
                let args = deferred
                    .args
                    .into_iter()
                    .map(|a| self.convert(a))
                    .collect::<Result<Vec<_>>>()?;
                let mut kwargs = IndexMap::with_capacity(deferred.kwargs.len());
                for (name, arg) in deferred.kwargs {
                    let id = self.convert(arg)?;
                    kwargs.insert(name, id);
                }
                self.apply(deferred.func, args, kwargs)
            }
        }
    }

    /// Build a deferred call of `func` with positional arguments.
    pub fn call(
        &mut self,
        func: impl Into<Callable>,
        args: Vec<Term>,
    ) -> Result<NodeId> {
        let deferred = args.into_iter().fold(Deferred::new(func), |d, a| d.arg(a));
        self.convert(deferred)
    }

    fn convert_sequence(
        &mut self,
        kind: SequenceKind,
        items: impl IntoIterator<Item = Term>,
    ) -> Result<NodeId> {
        let ids = items.into_iter().map(|t| self.convert(t)).collect::<Result<Vec<_>>>()?;
        self.sequence(kind, ids)
    }

    fn convert_mapping(
        &mut self,
        kind: MappingKind,
        entries: Vec<(Term, Term)>,
    ) -> Result<NodeId> {
        let class = self.literal(Value::MappingClass(kind));
        let mut pairs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            pairs.push(self.convert(Term::Tuple(vec![key, value]))?);
        }
        // Literal keys first so lazy lookup can stop at the first match.
        pairs.sort_by_key(|pair| !self[self[*pair].args()[0]].is_literal());

        let mut args = Vec::with_capacity(pairs.len() + 1);
        args.push(class);
        args.extend(pairs);
        self.push(NodeKind::Mapping, args, IndexMap::new())
    }

    /// Build a variable placeholder.
    ///
    /// # Errors
    ///
    /// `GraphError::Construction` if the name is not an identifier or an
    /// extra metadata key shadows a standard one.
    pub fn variable(
        &mut self,
        spec: VariableSpec,
    ) -> Result<NodeId> {
        if !is_identifier(&spec.name) {
            return Err(GraphError::construction(format!("invalid variable name '{}'", spec.name)));
        }
        if let Some(key) = spec.extra.keys().find(|k| STANDARD_KEYS.contains(&k.as_str())) {
            return Err(GraphError::construction(format!("metadata key '{}' is reserved", key)));
        }

        let standard = [
            Value::str(&spec.name),
            spec.domain.to_value(),
            spec.minimum.unwrap_or_default(),
            spec.maximum.unwrap_or_default(),
            spec.default.unwrap_or_default(),
            Value::Bool(spec.log_scale),
            spec.distribution.unwrap_or_default(),
        ];
        let mut kwargs = IndexMap::with_capacity(STANDARD_KEYS.len() + spec.extra.len());
        for (key, value) in STANDARD_KEYS.iter().zip(standard) {
            kwargs.insert(key.to_string(), self.literal(value));
        }
        for (key, value) in spec.extra {
            let id = self.literal(value);
            kwargs.insert(key, id);
        }
        self.push(NodeKind::Variable, Vec::new(), kwargs)
    }

    /// Read the metadata of a variable placeholder.
    pub fn variable_info(
        &self,
        id: NodeId,
    ) -> Result<VariableInfo> {
        let node = self.node(id)?;
        if !node.is_variable() {
            return Err(GraphError::construction(format!("{} is not a variable", id)));
        }
        let literal = |key: &str| -> Result<Option<Value>> {
            match node.kwarg(key) {
                None => Ok(None),
                Some(child) => match self.literal_value(child) {
                    Some(Value::None) => Ok(None),
                    Some(v) => Ok(Some(v.clone())),
                    None => Err(GraphError::construction(format!(
                        "variable metadata '{}' of {} is not a literal",
                        key, id
                    ))),
                },
            }
        };

        let name = match literal("name")? {
            Some(Value::Str(s)) => s.to_string(),
            _ => return Err(GraphError::construction(format!("variable {} has no string name", id))),
        };
        let domain = literal("value_type")?
            .as_ref()
            .and_then(Domain::from_value)
            .ok_or_else(|| GraphError::construction(format!("variable '{}' has no valid value_type", name)))?;
        let mut extra = IndexMap::new();
        for key in node.kwargs().keys() {
            if !STANDARD_KEYS.contains(&key.as_str()) {
                extra.insert(key.clone(), literal(key)?.unwrap_or_default());
            }
        }

        Ok(VariableSpec {
            name,
            domain,
            minimum: literal("minimum")?,
            maximum: literal("maximum")?,
            default: literal("default")?,
            log_scale: literal("log_scale")?.is_some_and(|v| v.is_truthy()),
            distribution: literal("distribution")?,
            extra,
        })
    }

    /// Build a choice node: pick the alternative whose key equals the value
    /// `selector` evaluates to.
    ///
    /// # Errors
    ///
    /// `GraphError::Construction` if an alternative's key is not a literal.
    pub fn choice(
        &mut self,
        selector: impl Into<Term>,
        alternatives: Vec<(Term, Term)>,
    ) -> Result<NodeId> {
        if let Some((key, _)) = alternatives.iter().find(|(k, _)| !k.converts_to_literal(self)) {
            return Err(GraphError::construction(format!(
                "choice alternatives must have literal keys, got {:?}",
                key
            )));
        }
        let selector = self.convert(selector)?;
        let table = self.convert_mapping(MappingKind::Dict, alternatives)?;
        let lookup = self.apply(Op::GetItem, vec![table, selector], IndexMap::new())?;
        self.push(NodeKind::Choice, vec![lookup], IndexMap::new())
    }

    /// The lookup inside a well-formed choice node: `(mapping, selector)`.
    fn choice_parts(
        &self,
        id: NodeId,
    ) -> Result<(NodeId, NodeId)> {
        let node = self.node(id)?;
        let malformed = || GraphError::construction(format!("{} is not a well-formed choice node", id));
        if !node.is_choice() || node.args().len() != 1 || !node.kwargs().is_empty() {
            return Err(malformed());
        }
        let lookup = self.node(node.args()[0])?;
        if !lookup.is_get_item() || lookup.args().len() != 2 || !lookup.kwargs().is_empty() {
            return Err(malformed());
        }
        let table = self.node(lookup.args()[0])?;
        if !self.is_mapping_constructor(table) {
            return Err(malformed());
        }
        Ok((table.id(), lookup.args()[1]))
    }

    /// Node whose value selects the alternative of a choice.
    pub fn choice_selector(
        &self,
        id: NodeId,
    ) -> Result<NodeId> {
        Ok(self.choice_parts(id)?.1)
    }

    /// Alternatives of a choice node as `(key, value node)` pairs.
    ///
    /// # Errors
    ///
    /// `GraphError::Construction` if the node is not a choice or an
    /// alternative is not a literal-keyed pair.
    pub fn choice_alternatives(
        &self,
        id: NodeId,
    ) -> Result<Vec<(Value, NodeId)>> {
        let (table, _) = self.choice_parts(id)?;
        self[table].args()[1..]
            .iter()
            .map(|pair| {
                let pair = self.node(*pair)?;
                let key = pair
                    .is_pair()
                    .then(|| self.literal_value(pair.args()[0]))
                    .flatten()
                    .ok_or_else(|| {
                        GraphError::construction(format!("alternative {} of choice {} is not a literal-keyed pair", pair.id(), id))
                    })?;
                Ok((key.clone(), pair.args()[1]))
            })
            .collect()
    }
}
