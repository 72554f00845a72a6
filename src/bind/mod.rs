//! Parameter binding
//!
//! Maps the positional and keyword arguments of a call node onto the named
//! parameters of its target, the way a call would bind them, without
//! evaluating or mutating anything.

use indexmap::IndexMap;

use crate::error::{BindErrorKind, GraphError, Result};
use crate::graph::{Graph, NodeId};
use crate::value::Value;

/// Declared parameters of a callable.
///
/// Defaults are right-aligned: with params `(a, b, c)` and one default,
/// the default belongs to `c`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    params: Vec<String>,
    defaults: Vec<Value>,
    varargs: Option<String>,
    varkw: Option<String>,
}

impl Signature {
    pub fn new<S: Into<String>>(params: impl IntoIterator<Item = S>) -> Self {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// `(*args, **kwargs)`
    pub fn any() -> Self {
        Self::default().with_varargs("args").with_varkw("kwargs")
    }

    pub fn with_defaults(
        mut self,
        defaults: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.defaults = defaults.into_iter().collect();
        self
    }

    pub fn with_varargs(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.varargs = Some(name.into());
        self
    }

    pub fn with_varkw(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.varkw = Some(name.into());
        self
    }

    #[inline]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[inline]
    pub fn defaults(&self) -> &[Value] {
        &self.defaults
    }

    #[inline]
    pub fn varargs(&self) -> Option<&str> {
        self.varargs.as_deref()
    }

    #[inline]
    pub fn varkw(&self) -> Option<&str> {
        self.varkw.as_deref()
    }

    /// Default for `param`, if one is declared.
    pub fn default_for(
        &self,
        param: &str,
    ) -> Option<&Value> {
        let offset = self.params.len().saturating_sub(self.defaults.len());
        self.params
            .iter()
            .skip(offset)
            .zip(&self.defaults)
            .find(|(name, _)| name.as_str() == param)
            .map(|(_, value)| value)
    }
}

/// What a single parameter ended up bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// An argument node
    Node(NodeId),
    /// The declared default, as a literal value
    Default(Value),
    /// Overflow positional arguments collected by `*args`
    Positional(Vec<NodeId>),
    /// Unmatched keyword arguments collected by `**kwargs`
    Keywords(IndexMap<String, NodeId>),
    /// Neither passed nor defaulted
    Missing,
}

impl Bound {
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Bound::Missing)
    }

    #[inline]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Bound::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// The literal value behind this binding: the default, or the payload of
    /// a bound Literal node.
    pub fn literal<'g>(
        &'g self,
        graph: &'g Graph,
    ) -> Option<&'g Value> {
        match self {
            Bound::Default(value) => Some(value),
            Bound::Node(id) => graph.literal_value(*id),
            _ => None,
        }
    }
}

/// Parameter name to binding, in declaration order followed by the
/// `*args` and `**kwargs` slots.
pub type Binding = IndexMap<String, Bound>;

/// Bind the arguments of `node` against `signature`.
pub fn bind(
    graph: &Graph,
    node: NodeId,
    signature: &Signature,
) -> Result<Binding> {
    let target = graph.node(node)?;
    let function = target.kind().label();
    let fail = |kind: BindErrorKind| GraphError::ArgumentBinding {
        function: function.clone(),
        kind,
    };

    let args = target.args();
    let params = signature.params();
    if args.len() > params.len() && signature.varargs().is_none() {
        return Err(fail(BindErrorKind::TooManyPositional {
            expected: params.len(),
            found: args.len(),
        }));
    }

    let mut bound: IndexMap<String, Bound> = IndexMap::new();
    for (param, arg) in params.iter().zip(args) {
        bound.insert(param.clone(), Bound::Node(*arg));
    }
    if let Some(varargs) = signature.varargs() {
        let overflow = args.get(params.len()..).unwrap_or_default().to_vec();
        bound.insert(varargs.to_string(), Bound::Positional(overflow));
    }

    let mut extra_keywords = IndexMap::new();
    if let Some(varkw) = signature.varkw() {
        bound.insert(varkw.to_string(), Bound::Missing);
    }
    for (name, arg) in target.kwargs() {
        let is_param = params.iter().any(|p| p == name);
        if is_param && !bound.contains_key(name) {
            bound.insert(name.clone(), Bound::Node(*arg));
        } else if bound.contains_key(name) && Some(name.as_str()) != signature.varkw() {
            return Err(fail(BindErrorKind::DuplicateArgument(name.clone())));
        } else if signature.varkw().is_some() {
            extra_keywords.insert(name.clone(), *arg);
        } else {
            return Err(fail(BindErrorKind::UnrecognizedKeyword(name.clone())));
        }
    }

    let mut binding = Binding::with_capacity(bound.len() + params.len());
    for param in params {
        let value = match bound.swap_remove(param) {
            Some(b) => b,
            None => match signature.default_for(param) {
                Some(default) => Bound::Default(default.clone()),
                None => Bound::Missing,
            },
        };
        binding.insert(param.clone(), value);
    }
    if let Some(varargs) = signature.varargs() {
        if let Some(b) = bound.swap_remove(varargs) {
            binding.insert(varargs.to_string(), b);
        }
    }
    if let Some(varkw) = signature.varkw() {
        binding.insert(varkw.to_string(), Bound::Keywords(extra_keywords));
    }
    Ok(binding)
}

impl Graph {
    /// Bind the arguments of `node` against its own callee's signature.
    ///
    /// Constructor, variable and choice nodes use the signature of their
    /// implicit constructor; literals have none.
    pub fn bind(
        &self,
        node: NodeId,
    ) -> Result<Binding> {
        let signature = self.signature_of(node)?;
        bind(self, node, &signature)
    }
}
