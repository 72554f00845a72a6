//! Primitive operations behind the arithmetic, comparison and indexing sugar

use std::cmp::Ordering;

use crate::bind::Signature;
use crate::error::{GraphError, Result};
use crate::value::{Slice, Value};

/// A primitive operation a call node can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    DivMod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Neg,
    Pos,
    Abs,
    Invert,
    GetItem,
}

/// Integer-or-float view of a numeric operand.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Float(f) => Some(Num::Float(*f)),
            other => other.as_int().map(Num::Int),
        }
    }

    fn float(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::TrueDiv => "truediv",
            Op::FloorDiv => "floordiv",
            Op::Mod => "mod",
            Op::DivMod => "divmod",
            Op::Pow => "pow",
            Op::LShift => "lshift",
            Op::RShift => "rshift",
            Op::BitAnd => "and_",
            Op::BitOr => "or_",
            Op::BitXor => "xor",
            Op::Lt => "lt",
            Op::Le => "le",
            Op::Gt => "gt",
            Op::Ge => "ge",
            Op::Eq => "eq",
            Op::Ne => "ne",
            Op::Neg => "neg",
            Op::Pos => "pos",
            Op::Abs => "abs",
            Op::Invert => "invert",
            Op::GetItem => "getitem",
        }
    }

    /// Operator symbol used when rendering an expression.
    pub fn symbol(&self) -> Option<&'static str> {
        Some(match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::TrueDiv => "/",
            Op::FloorDiv => "//",
            Op::Mod => "%",
            Op::Pow => "**",
            Op::LShift => "<<",
            Op::RShift => ">>",
            Op::BitAnd => "&",
            Op::BitOr => "|",
            Op::BitXor => "^",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Neg => "-",
            Op::Pos => "+",
            Op::Invert => "~",
            Op::DivMod | Op::Abs | Op::GetItem => return None,
        })
    }

    #[inline]
    pub fn is_unary(&self) -> bool {
        matches!(self, Op::Neg | Op::Pos | Op::Abs | Op::Invert)
    }

    pub fn signature(&self) -> Signature {
        match self {
            Op::Pow => Signature::new(["base", "exp", "modulo"]).with_defaults([Value::None]),
            Op::GetItem => Signature::new(["obj", "index"]),
            op if op.is_unary() => Signature::new(["a"]),
            _ => Signature::new(["a", "b"]),
        }
    }

    /// Apply the operation to evaluated operands.
    pub fn apply(
        &self,
        args: &[Value],
    ) -> Result<Value> {
        match (self, args) {
            (Op::Pow, [base, exp]) | (Op::Pow, [base, exp, Value::None]) => self.pow(base, exp),
            (Op::Pow, [base, exp, modulo]) => self.pow_mod(base, exp, modulo),
            (op, [a]) if op.is_unary() => self.unary(a),
            (op, [a, b]) if !op.is_unary() => self.binary(a, b),
            _ => Err(self.error(format!("expected {} operand(s), got {}", self.signature().params().len(), args.len()))),
        }
    }

    fn error(
        &self,
        message: impl Into<String>,
    ) -> GraphError {
        GraphError::Operation {
            op: self.name(),
            message: message.into(),
        }
    }

    fn unsupported(
        &self,
        a: &Value,
        b: &Value,
    ) -> GraphError {
        self.error(format!(
            "unsupported operand types '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))
    }

    fn overflow(&self) -> GraphError {
        self.error("integer overflow")
    }

    fn too_long(
        &self,
        len: usize,
    ) -> GraphError {
        self.error(format!("cannot allocate a result of length {}", len))
    }

    fn unary(
        &self,
        a: &Value,
    ) -> Result<Value> {
        let num = Num::of(a).ok_or_else(|| self.error(format!("bad operand type '{}'", a.type_name())))?;
        match (self, num) {
            (Op::Neg, Num::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(|| self.overflow()),
            (Op::Neg, Num::Float(f)) => Ok(Value::Float(-f)),
            (Op::Pos, Num::Int(i)) => Ok(Value::Int(i)),
            (Op::Pos, Num::Float(f)) => Ok(Value::Float(f)),
            (Op::Abs, Num::Int(i)) => i.checked_abs().map(Value::Int).ok_or_else(|| self.overflow()),
            (Op::Abs, Num::Float(f)) => Ok(Value::Float(f.abs())),
            (Op::Invert, Num::Int(i)) => Ok(Value::Int(!i)),
            _ => Err(self.error(format!("bad operand type '{}'", a.type_name()))),
        }
    }

    fn binary(
        &self,
        a: &Value,
        b: &Value,
    ) -> Result<Value> {
        match self {
            Op::Add => self.add(a, b),
            Op::Mul => self.mul(a, b),
            Op::Sub | Op::TrueDiv | Op::FloorDiv | Op::Mod | Op::DivMod => self.arithmetic(a, b),
            Op::LShift | Op::RShift | Op::BitAnd | Op::BitOr | Op::BitXor => self.bitwise(a, b),
            Op::Eq => Ok(Value::Bool(a == b)),
            Op::Ne => Ok(Value::Bool(a != b)),
            Op::Lt | Op::Le | Op::Gt | Op::Ge => self.compare(a, b),
            Op::GetItem => get_item(a, b),
            Op::Pow => self.pow(a, b),
            Op::Neg | Op::Pos | Op::Abs | Op::Invert => Err(self.error("takes one operand")),
        }
    }

    fn add(
        &self,
        a: &Value,
        b: &Value,
    ) -> Result<Value> {
        match (a, b) {
            (Value::Str(x), Value::Str(y)) => Ok(Value::str(format!("{}{}", x, y))),
            (Value::List(x), Value::List(y)) => Ok(Value::List(x.iter().chain(y).cloned().collect())),
            (Value::Tuple(x), Value::Tuple(y)) => Ok(Value::Tuple(x.iter().chain(y).cloned().collect())),
            _ => self.arithmetic(a, b),
        }
    }

    fn mul(
        &self,
        a: &Value,
        b: &Value,
    ) -> Result<Value> {
        match (a, b) {
            (Value::Str(s), n) | (n, Value::Str(s)) if matches!(n, Value::Int(_) | Value::Bool(_)) => {
                self.repeat_str(s, n.as_int().unwrap_or(0)).map(Value::str)
            }
            (Value::List(items), n) | (n, Value::List(items)) if matches!(n, Value::Int(_) | Value::Bool(_)) => {
                self.repeat_items(items, n.as_int().unwrap_or(0)).map(Value::List)
            }
            (Value::Tuple(items), n) | (n, Value::Tuple(items)) if matches!(n, Value::Int(_) | Value::Bool(_)) => {
                self.repeat_items(items, n.as_int().unwrap_or(0)).map(Value::Tuple)
            }
            _ => self.arithmetic(a, b),
        }
    }

    /// `items` repeated `n` times; a negative count gives an empty result.
    fn repeat_items(
        &self,
        items: &[Value],
        n: i64,
    ) -> Result<Vec<Value>> {
        let n = usize::try_from(n).unwrap_or(0);
        let len = items.len().checked_mul(n).ok_or_else(|| self.overflow())?;
        let mut out = Vec::new();
        out.try_reserve_exact(len).map_err(|_| self.too_long(len))?;
        out.extend(items.iter().cloned().cycle().take(len));
        Ok(out)
    }

    fn repeat_str(
        &self,
        s: &str,
        n: i64,
    ) -> Result<String> {
        let n = usize::try_from(n).unwrap_or(0);
        if s.is_empty() {
            return Ok(String::new());
        }
        let len = s.len().checked_mul(n).ok_or_else(|| self.overflow())?;
        let mut out = String::new();
        out.try_reserve_exact(len).map_err(|_| self.too_long(len))?;
        for _ in 0..n {
            out.push_str(s);
        }
        Ok(out)
    }

    fn arithmetic(
        &self,
        a: &Value,
        b: &Value,
    ) -> Result<Value> {
        let (x, y) = match (Num::of(a), Num::of(b)) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(self.unsupported(a, b)),
        };
        match (x, y) {
            (Num::Int(x), Num::Int(y)) => self.int_arithmetic(x, y),
            _ => self.float_arithmetic(x.float(), y.float()),
        }
    }

    fn int_arithmetic(
        &self,
        x: i64,
        y: i64,
    ) -> Result<Value> {
        let checked = |v: Option<i64>| v.map(Value::Int).ok_or_else(|| self.overflow());
        match self {
            Op::Add => checked(x.checked_add(y)),
            Op::Sub => checked(x.checked_sub(y)),
            Op::Mul => checked(x.checked_mul(y)),
            Op::TrueDiv => self.float_arithmetic(x as f64, y as f64),
            Op::FloorDiv | Op::Mod | Op::DivMod => {
                if y == 0 {
                    return Err(self.error("integer division or modulo by zero"));
                }
                let (q, r) = floor_divmod(x, y).ok_or_else(|| self.overflow())?;
                Ok(match self {
                    Op::FloorDiv => Value::Int(q),
                    Op::Mod => Value::Int(r),
                    _ => Value::Tuple(vec![Value::Int(q), Value::Int(r)]),
                })
            }
            _ => Err(self.error("not an arithmetic operation")),
        }
    }

    fn float_arithmetic(
        &self,
        x: f64,
        y: f64,
    ) -> Result<Value> {
        let needs_divisor = matches!(self, Op::TrueDiv | Op::FloorDiv | Op::Mod | Op::DivMod);
        if needs_divisor && y == 0.0 {
            return Err(self.error("float division by zero"));
        }
        let floor_mod = |x: f64, y: f64| {
            let r = x % y;
            if r != 0.0 && (r < 0.0) != (y < 0.0) {
                r + y
            } else {
                r
            }
        };
        Ok(match self {
            Op::Add => Value::Float(x + y),
            Op::Sub => Value::Float(x - y),
            Op::Mul => Value::Float(x * y),
            Op::TrueDiv => Value::Float(x / y),
            Op::FloorDiv => Value::Float((x / y).floor()),
            Op::Mod => Value::Float(floor_mod(x, y)),
            Op::DivMod => Value::Tuple(vec![Value::Float((x / y).floor()), Value::Float(floor_mod(x, y))]),
            _ => return Err(self.error("not an arithmetic operation")),
        })
    }

    fn bitwise(
        &self,
        a: &Value,
        b: &Value,
    ) -> Result<Value> {
        if let (Value::Bool(x), Value::Bool(y)) = (a, b) {
            match self {
                Op::BitAnd => return Ok(Value::Bool(x & y)),
                Op::BitOr => return Ok(Value::Bool(x | y)),
                Op::BitXor => return Ok(Value::Bool(x ^ y)),
                _ => {}
            }
        }
        let (x, y) = match (a, b) {
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                (a.as_int().unwrap_or_default(), b.as_int().unwrap_or_default())
            }
            _ => return Err(self.unsupported(a, b)),
        };
        match self {
            Op::BitAnd => Ok(Value::Int(x & y)),
            Op::BitOr => Ok(Value::Int(x | y)),
            Op::BitXor => Ok(Value::Int(x ^ y)),
            Op::LShift | Op::RShift if y < 0 => Err(self.error("negative shift count")),
            Op::LShift => {
                let shifted = u32::try_from(y)
                    .ok()
                    .and_then(|s| x.checked_mul(1i64.checked_shl(s).filter(|m| *m > 0)?));
                match shifted {
                    Some(v) => Ok(Value::Int(v)),
                    None if x == 0 => Ok(Value::Int(0)),
                    None => Err(self.overflow()),
                }
            }
            Op::RShift => Ok(Value::Int(if y >= 64 { if x < 0 { -1 } else { 0 } } else { x >> y })),
            _ => Err(self.error("not a bitwise operation")),
        }
    }

    fn compare(
        &self,
        a: &Value,
        b: &Value,
    ) -> Result<Value> {
        let ordering = a.compare(b).ok_or_else(|| {
            self.error(format!(
                "'{}' not supported between '{}' and '{}'",
                self.symbol().unwrap_or(self.name()),
                a.type_name(),
                b.type_name()
            ))
        })?;
        Ok(Value::Bool(match self {
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        }))
    }

    fn pow(
        &self,
        base: &Value,
        exp: &Value,
    ) -> Result<Value> {
        match (Num::of(base), Num::of(exp)) {
            (Some(Num::Int(b)), Some(Num::Int(e))) if e >= 0 => u32::try_from(e)
                .ok()
                .and_then(|e| b.checked_pow(e))
                .map(Value::Int)
                .ok_or_else(|| self.overflow()),
            (Some(b), Some(e)) => {
                let (b, e) = (b.float(), e.float());
                if b == 0.0 && e < 0.0 {
                    return Err(self.error("0.0 cannot be raised to a negative power"));
                }
                Ok(Value::Float(b.powf(e)))
            }
            _ => Err(self.unsupported(base, exp)),
        }
    }

    fn pow_mod(
        &self,
        base: &Value,
        exp: &Value,
        modulo: &Value,
    ) -> Result<Value> {
        let (b, e, m) = match (base, exp, modulo) {
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => (
                base.as_int().unwrap_or_default(),
                exp.as_int().unwrap_or_default(),
                modulo.as_int().unwrap_or_default(),
            ),
            _ => return Err(self.error("pow() 3rd argument not allowed unless all arguments are integers")),
        };
        if e < 0 {
            return Err(self.error("pow() 2nd argument cannot be negative when 3rd argument specified"));
        }
        if m == 0 {
            return Err(self.error("pow() 3rd argument cannot be 0"));
        }
        let m = i128::from(m);
        let mut result: i128 = 1;
        let mut b = i128::from(b).rem_euclid(m.abs());
        let mut e = e;
        while e > 0 {
            if e & 1 == 1 {
                result = (result * b).rem_euclid(m.abs());
            }
            b = (b * b).rem_euclid(m.abs());
            e >>= 1;
        }
        result %= m.abs();
        // Result takes the sign of the modulus.
        if m < 0 && result != 0 {
            result += m;
        }
        Ok(Value::Int(result as i64))
    }
}

/// Floor division and modulo with the remainder taking the divisor's sign.
fn floor_divmod(
    x: i64,
    y: i64,
) -> Option<(i64, i64)> {
    let q = x.checked_div(y)?;
    let r = x.checked_rem(y)?;
    if r != 0 && ((r < 0) != (y < 0)) {
        Some((q - 1, r + y))
    } else {
        Some((q, r))
    }
}

/// Resolve a possibly negative index against `len`.
pub(crate) fn normalize_index(
    index: i64,
    len: usize,
) -> Result<usize> {
    let signed_len = len as i64;
    let resolved = if index < 0 { index + signed_len } else { index };
    if resolved < 0 || resolved >= signed_len {
        return Err(GraphError::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

/// Item access on evaluated values.
pub(crate) fn get_item(
    container: &Value,
    index: &Value,
) -> Result<Value> {
    match (container, index) {
        (Value::List(items), Value::Slice(slice)) => Ok(Value::List(select(items, slice)?)),
        (Value::Tuple(items), Value::Slice(slice)) => Ok(Value::Tuple(select(items, slice)?)),
        (Value::List(items) | Value::Tuple(items), idx @ (Value::Int(_) | Value::Bool(_))) => {
            let i = normalize_index(idx.as_int().unwrap_or_default(), items.len())?;
            Ok(items[i].clone())
        }
        (Value::Str(s), Value::Slice(slice)) => {
            let chars: Vec<char> = s.chars().collect();
            let picked: String = slice.indices(chars.len())?.into_iter().map(|i| chars[i]).collect();
            Ok(Value::str(picked))
        }
        (Value::Str(s), idx @ (Value::Int(_) | Value::Bool(_))) => {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(idx.as_int().unwrap_or_default(), chars.len())?;
            Ok(Value::str(chars[i].to_string()))
        }
        (Value::Map(map), key) => map
            .get(key)
            .cloned()
            .ok_or_else(|| GraphError::KeyNotFound { key: key.clone() }),
        (Value::List(_) | Value::Tuple(_) | Value::Str(_), other) => Err(GraphError::Operation {
            op: "getitem",
            message: format!("indices must be integers or slices, not {}", other.type_name()),
        }),
        (other, _) => Err(GraphError::Operation {
            op: "getitem",
            message: format!("'{}' object is not subscriptable", other.type_name()),
        }),
    }
}

fn select(
    items: &[Value],
    slice: &Slice,
) -> Result<Vec<Value>> {
    Ok(slice.indices(items.len())?.into_iter().map(|i| items[i].clone()).collect())
}
