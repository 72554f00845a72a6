//! Builtin function registry
//!
//! Conversion helpers exposed as [`Function`]s so graphs can call them the
//! same way they call user closures.

use anyhow::{anyhow, bail};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::Function;
use crate::bind::Signature;
use crate::value::{exact_int, Value};

/// Process-wide builtin registry.
pub static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(|| {
    let mut registry = FunctionRegistry::new();
    registry.init_builtins();
    registry
});

/// Look up a builtin by name.
///
/// Repeated lookups return handles to the same function, so they compare
/// equal.
pub fn builtin(name: &str) -> Option<Function> {
    BUILTINS.get(name).cloned()
}

/// Name to function table.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        func: Function,
    ) {
        self.functions.insert(func.name().to_string(), func);
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    fn init_builtins(&mut self) {
        let one = || Signature::new(["x"]);
        self.register(Function::new("int", one(), positional1(to_int)));
        self.register(Function::new("float", one(), positional1(to_float)));
        self.register(Function::new("str", one(), positional1(|v| Ok(Value::str(v.to_string())))));
        self.register(Function::new("bool", one(), positional1(|v| Ok(Value::Bool(v.is_truthy())))));
        self.register(Function::new("len", one(), positional1(length)));
        self.register(Function::new("abs", one(), positional1(absolute)));
        self.register(Function::new(
            "round",
            Signature::new(["x", "ndigits"]).with_defaults([Value::None]),
            round,
        ));
        self.register(Function::new("min", Signature::any(), |args, _| extremum(args, true)));
        self.register(Function::new("max", Signature::any(), |args, _| extremum(args, false)));
    }
}

/// Adapt a one-argument conversion to the native calling convention.
fn positional1(
    f: impl Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static
) -> impl Fn(&[Value], &IndexMap<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static {
    move |args: &[Value], kwargs: &IndexMap<String, Value>| match (args, kwargs.get("x")) {
        ([v], None) | ([], Some(v)) => f(v),
        _ => bail!("expected exactly one argument, got {}", args.len() + kwargs.len()),
    }
}

fn to_int(v: &Value) -> anyhow::Result<Value> {
    match v {
        Value::Int(_) | Value::Bool(_) => Ok(Value::Int(v.as_int().unwrap_or_default())),
        Value::Float(f) => exact_int(f.trunc())
            .map(Value::Int)
            .ok_or_else(|| anyhow!("cannot convert float {} to integer", f)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| anyhow!("invalid literal for int(): '{}'", s)),
        other => bail!("int() argument must be a string or a number, not '{}'", other.type_name()),
    }
}

fn to_float(v: &Value) -> anyhow::Result<Value> {
    match v {
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| anyhow!("could not convert string to float: '{}'", s)),
        other => other
            .as_float()
            .map(Value::Float)
            .ok_or_else(|| anyhow!("float() argument must be a string or a number, not '{}'", other.type_name())),
    }
}

fn length(v: &Value) -> anyhow::Result<Value> {
    let n = match v {
        Value::Str(s) => s.chars().count(),
        Value::List(items) | Value::Tuple(items) => items.len(),
        Value::Map(map) => map.len(),
        other => bail!("object of type '{}' has no len()", other.type_name()),
    };
    Ok(Value::Int(n as i64))
}

fn absolute(v: &Value) -> anyhow::Result<Value> {
    match v {
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::Int(_) | Value::Bool(_) => v
            .as_int()
            .and_then(i64::checked_abs)
            .map(Value::Int)
            .ok_or_else(|| anyhow!("integer overflow in abs()")),
        other => bail!("bad operand type for abs(): '{}'", other.type_name()),
    }
}

fn round(
    args: &[Value],
    kwargs: &IndexMap<String, Value>,
) -> anyhow::Result<Value> {
    let x = args.first().or_else(|| kwargs.get("x")).ok_or_else(|| anyhow!("round() missing argument 'x'"))?;
    let ndigits = args.get(1).or_else(|| kwargs.get("ndigits")).unwrap_or(&Value::None);
    match (x, ndigits) {
        (Value::Int(_) | Value::Bool(_), Value::None) => Ok(Value::Int(x.as_int().unwrap_or_default())),
        (Value::Float(f), Value::None) => exact_int(round_half_even(*f))
            .map(Value::Int)
            .ok_or_else(|| anyhow!("cannot convert float {} to integer", f)),
        (Value::Float(f), digits) => {
            let digits = digits.as_int().ok_or_else(|| anyhow!("ndigits must be an integer"))?;
            if !f.is_finite() {
                return Ok(Value::Float(*f));
            }
            // f64 has no digits beyond 10^±400
            let scale = 10f64.powi(digits.clamp(-400, 400) as i32);
            let scaled = f * scale;
            if !scaled.is_finite() {
                return Ok(Value::Float(*f));
            }
            if scale == 0.0 {
                return Ok(Value::Float(0.0f64.copysign(*f)));
            }
            Ok(Value::Float(round_half_even(scaled) / scale))
        }
        (Value::Int(_) | Value::Bool(_), _) => Ok(Value::Int(x.as_int().unwrap_or_default())),
        (other, _) => bail!("type '{}' doesn't define __round__", other.type_name()),
    }
}

/// Banker's rounding.
fn round_half_even(f: f64) -> f64 {
    let r = f.round();
    if (f - f.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - f.signum()
    } else {
        r
    }
}

fn extremum(
    args: &[Value],
    want_min: bool,
) -> anyhow::Result<Value> {
    let items = match args {
        [single] => single
            .as_sequence()
            .ok_or_else(|| anyhow!("'{}' object is not iterable", single.type_name()))?,
        many => many,
    };
    let mut best = items.first().ok_or_else(|| anyhow!("arg is an empty sequence"))?;
    for item in &items[1..] {
        let ordering = item
            .compare(best)
            .ok_or_else(|| anyhow!("cannot compare '{}' and '{}'", item.type_name(), best.type_name()))?;
        let better = if want_min { ordering.is_lt() } else { ordering.is_gt() };
        if better {
            best = item;
        }
    }
    Ok(best.clone())
}
