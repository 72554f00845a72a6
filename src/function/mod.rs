//! Call targets of graph nodes
//!
//! A call node points either at one of the primitive operations in [`Op`]
//! or at a native [`Function`]. Both report a [`Signature`] so the binder
//! can map arguments onto parameter names.

pub mod builtins;
mod op;

pub use op::Op;
pub(crate) use op::normalize_index;

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::bind::Signature;
use crate::error::{GraphError, Result};
use crate::value::Value;

/// Body of a native function.
pub type NativeFn = dyn Fn(&[Value], &IndexMap<String, Value>) -> anyhow::Result<Value> + Send + Sync;

/// A named native callable.
///
/// Two `Function`s are equal only when they share the same body, so a
/// cloned handle is the same function and a re-created closure is not.
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    signature: Option<Signature>,
    body: Arc<NativeFn>,
}

impl Function {
    /// Create a function with a declared signature.
    pub fn new<F>(
        name: &str,
        signature: Signature,
        body: F,
    ) -> Self
    where
        F: Fn(&[Value], &IndexMap<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            signature: Some(signature),
            body: Arc::new(body),
        }
    }

    /// Create a function that accepts any arguments.
    pub fn variadic<F>(
        name: &str,
        body: F,
    ) -> Self
    where
        F: Fn(&[Value], &IndexMap<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            signature: None,
            body: Arc::new(body),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn declared_signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Invoke the body. Its error, if any, is returned unchanged.
    #[inline]
    pub fn call(
        &self,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> Result<Value> {
        (self.body)(args, kwargs).map_err(GraphError::Function)
    }
}

impl PartialEq for Function {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Target of a call node.
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    Op(Op),
    Function(Function),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Op(op) => op.name(),
            Callable::Function(func) => func.name(),
        }
    }

    /// Signature used to bind arguments. Functions declared without one
    /// accept `(*args, **kwargs)`.
    pub fn signature(&self) -> Signature {
        match self {
            Callable::Op(op) => op.signature(),
            Callable::Function(func) => func
                .declared_signature()
                .cloned()
                .unwrap_or_else(Signature::any),
        }
    }

    /// Apply the callable to evaluated arguments.
    pub fn invoke(
        &self,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> Result<Value> {
        match self {
            Callable::Op(op) => {
                if let Some(name) = kwargs.keys().next() {
                    return Err(GraphError::Operation {
                        op: op.name(),
                        message: format!("takes no keyword arguments (got '{}')", name),
                    });
                }
                op.apply(args)
            }
            Callable::Function(func) => func.call(args, kwargs),
        }
    }
}

impl From<Op> for Callable {
    fn from(op: Op) -> Self {
        Callable::Op(op)
    }
}

impl From<Function> for Callable {
    fn from(func: Function) -> Self {
        Callable::Function(func)
    }
}

#[cfg(test)]
mod tests;
