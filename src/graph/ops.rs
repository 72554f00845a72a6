//! Operator sugar
//!
//! Each method wraps one primitive [`Op`] around its operands, converting
//! raw operands through the builder first. Nothing is evaluated.

use indexmap::IndexMap;

use super::{Graph, NodeId, Term};
use crate::error::Result;
use crate::function::Op;

macro_rules! unary_ops {
    ($($(#[$doc:meta])* $name:ident => $op:ident;)*) => {
        impl Graph {
            $(
                $(#[$doc])*
                pub fn $name(
                    &mut self,
                    operand: impl Into<Term>,
                ) -> Result<NodeId> {
                    self.operate(Op::$op, vec![operand.into()])
                }
            )*
        }
    };
}

macro_rules! binary_ops {
    ($($(#[$doc:meta])* $name:ident => $op:ident;)*) => {
        impl Graph {
            $(
                $(#[$doc])*
                pub fn $name(
                    &mut self,
                    lhs: impl Into<Term>,
                    rhs: impl Into<Term>,
                ) -> Result<NodeId> {
                    self.operate(Op::$op, vec![lhs.into(), rhs.into()])
                }
            )*
        }
    };
}

unary_ops! {
    /// `-a`
    neg => Neg;
    /// `+a`
    pos => Pos;
    /// `abs(a)`
    abs => Abs;
    /// `~a`
    invert => Invert;
}

binary_ops! {
    /// `a + b`
    add => Add;
    /// `a - b`
    sub => Sub;
    /// `a * b`
    mul => Mul;
    /// `a / b`, always a float
    truediv => TrueDiv;
    /// `a // b`
    floordiv => FloorDiv;
    /// `a % b`
    modulo => Mod;
    /// `divmod(a, b)`
    divmod => DivMod;
    /// `a ** b`
    pow => Pow;
    lshift => LShift;
    rshift => RShift;
    bitand => BitAnd;
    bitor => BitOr;
    bitxor => BitXor;
    lt => Lt;
    le => Le;
    gt => Gt;
    ge => Ge;
    /// `a == b`, as a node
    equal => Eq;
    /// `a != b`, as a node
    not_equal => Ne;
}

impl Graph {
    /// `pow(base, exp, modulo)`
    pub fn pow_mod(
        &mut self,
        base: impl Into<Term>,
        exp: impl Into<Term>,
        modulo: impl Into<Term>,
    ) -> Result<NodeId> {
        self.operate(Op::Pow, vec![base.into(), exp.into(), modulo.into()])
    }

    /// `container[index]`
    ///
    /// When `container` is a list, tuple or mapping constructor the result
    /// is indexed lazily by the evaluator.
    ///
    /// # Examples
    ///
    /// ```
    /// use searchspaces::graph::{Graph, Term};
    ///
    /// let mut graph = Graph::new();
    /// let list = graph.convert(Term::List(vec![1.into(), 2.into()])).unwrap();
    /// let item = graph.get_item(list, 1).unwrap();
    /// assert!(graph.is_indexable(item));
    /// ```
    pub fn get_item(
        &mut self,
        container: impl Into<Term>,
        index: impl Into<Term>,
    ) -> Result<NodeId> {
        self.operate(Op::GetItem, vec![container.into(), index.into()])
    }

    fn operate(
        &mut self,
        op: Op,
        operands: Vec<Term>,
    ) -> Result<NodeId> {
        let args = operands.into_iter().map(|t| self.convert(t)).collect::<Result<Vec<_>>>()?;
        self.apply(op, args, IndexMap::new())
    }
}
