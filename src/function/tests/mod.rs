//! Callable unit tests

use indexmap::IndexMap;

use crate::bind::Signature;
use crate::error::GraphError;
use crate::function::builtins::{builtin, BUILTINS};
use crate::function::{Callable, Function, Op};
use crate::value::{Mapping, MappingKind, Value};

fn apply(
    op: Op,
    args: &[Value],
) -> Value {
    op.apply(args).unwrap()
}

fn call(
    name: &str,
    args: &[Value],
) -> Value {
    builtin(name).unwrap().call(args, &IndexMap::new()).unwrap()
}

#[cfg(test)]
mod arithmetic_tests {
    use super::*;

    #[test]
    fn test_add() {
        assert_eq!(apply(Op::Add, &[Value::Int(2), Value::Int(3)]), Value::Int(5));
        assert_eq!(apply(Op::Add, &[Value::Int(1), Value::Float(2.5)]), Value::Float(3.5));
        assert_eq!(apply(Op::Add, &[Value::str("ab"), Value::str("c")]), Value::str("abc"));
        assert_eq!(
            apply(Op::Add, &[Value::List(vec![Value::Int(1)]), Value::List(vec![Value::Int(2)])]),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_true_division_is_float() {
        assert_eq!(apply(Op::TrueDiv, &[Value::Int(7), Value::Int(2)]), Value::Float(3.5));
        assert!(matches!(apply(Op::TrueDiv, &[Value::Int(4), Value::Int(2)]), Value::Float(_)));
    }

    #[test]
    fn test_floor_division_rounds_down() {
        assert_eq!(apply(Op::FloorDiv, &[Value::Int(-7), Value::Int(2)]), Value::Int(-4));
        assert_eq!(apply(Op::Mod, &[Value::Int(-7), Value::Int(2)]), Value::Int(1));
        assert_eq!(apply(Op::Mod, &[Value::Int(7), Value::Int(-2)]), Value::Int(-1));
        assert_eq!(apply(Op::Mod, &[Value::Int(9), Value::Int(4)]), Value::Int(1));
        assert_eq!(
            apply(Op::DivMod, &[Value::Int(7), Value::Int(2)]),
            Value::Tuple(vec![Value::Int(3), Value::Int(1)])
        );
        assert_eq!(apply(Op::Mod, &[Value::Float(-1.0), Value::Float(3.0)]), Value::Float(2.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            Op::FloorDiv.apply(&[Value::Int(1), Value::Int(0)]),
            Err(GraphError::Operation { op: "floordiv", .. })
        ));
        assert!(Op::TrueDiv.apply(&[Value::Float(1.0), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(Op::Mul.apply(&[Value::Int(i64::MAX), Value::Int(2)]).is_err());
        assert!(Op::Neg.apply(&[Value::Int(i64::MIN)]).is_err());
    }

    #[test]
    fn test_pow() {
        assert_eq!(apply(Op::Pow, &[Value::Int(2), Value::Int(10)]), Value::Int(1024));
        assert_eq!(apply(Op::Pow, &[Value::Int(2), Value::Int(-1)]), Value::Float(0.5));
        assert_eq!(apply(Op::Pow, &[Value::Int(3), Value::Int(4), Value::Int(5)]), Value::Int(1));
        assert_eq!(apply(Op::Pow, &[Value::Int(2), Value::Int(3), Value::Int(-3)]), Value::Int(-1));
        assert_eq!(apply(Op::Pow, &[Value::Int(2), Value::Int(3), Value::None]), Value::Int(8));
    }

    #[test]
    fn test_repetition() {
        assert_eq!(apply(Op::Mul, &[Value::str("ab"), Value::Int(3)]), Value::str("ababab"));
        assert_eq!(
            apply(Op::Mul, &[Value::Int(2), Value::Tuple(vec![Value::Int(0)])]),
            Value::Tuple(vec![Value::Int(0), Value::Int(0)])
        );
    }

    #[test]
    fn test_huge_repetition_is_an_error() {
        let pair = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(matches!(
            Op::Mul.apply(&[pair.clone(), Value::Int(i64::MAX)]),
            Err(GraphError::Operation { op: "mul", .. })
        ));
        assert!(Op::Mul.apply(&[Value::Int(i64::MAX), Value::Tuple(vec![Value::None; 3])]).is_err());
        assert!(Op::Mul.apply(&[Value::str("ab"), Value::Int(i64::MAX)]).is_err());

        assert_eq!(apply(Op::Mul, &[Value::str(""), Value::Int(i64::MAX)]), Value::str(""));
        assert_eq!(apply(Op::Mul, &[Value::List(vec![]), Value::Int(i64::MAX)]), Value::List(vec![]));
        assert_eq!(apply(Op::Mul, &[pair, Value::Int(-4)]), Value::List(vec![]));
    }

    #[test]
    fn test_unary() {
        assert_eq!(apply(Op::Neg, &[Value::Int(5)]), Value::Int(-5));
        assert_eq!(apply(Op::Pos, &[Value::Float(1.5)]), Value::Float(1.5));
        assert_eq!(apply(Op::Abs, &[Value::Int(-3)]), Value::Int(3));
        assert_eq!(apply(Op::Invert, &[Value::Int(5)]), Value::Int(-6));
    }

    #[test]
    fn test_wrong_operand_count() {
        assert!(Op::Add.apply(&[Value::Int(1)]).is_err());
        assert!(Op::Neg.apply(&[Value::Int(1), Value::Int(2)]).is_err());
    }
}

#[cfg(test)]
mod comparison_and_bitwise_tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        assert_eq!(apply(Op::Lt, &[Value::Int(1), Value::Int(2)]), Value::Bool(true));
        assert_eq!(apply(Op::Ge, &[Value::Float(2.0), Value::Int(2)]), Value::Bool(true));
        assert_eq!(apply(Op::Gt, &[Value::str("a"), Value::str("b")]), Value::Bool(false));
        assert_eq!(apply(Op::Eq, &[Value::Int(1), Value::Float(1.0)]), Value::Bool(true));
        assert_eq!(apply(Op::Ne, &[Value::Int(1), Value::str("1")]), Value::Bool(true));
        assert!(Op::Lt.apply(&[Value::Int(1), Value::str("a")]).is_err());
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(apply(Op::BitAnd, &[Value::Int(6), Value::Int(3)]), Value::Int(2));
        assert_eq!(apply(Op::BitOr, &[Value::Int(4), Value::Int(1)]), Value::Int(5));
        assert_eq!(apply(Op::BitXor, &[Value::Int(6), Value::Int(3)]), Value::Int(5));
        assert_eq!(apply(Op::BitAnd, &[Value::Bool(true), Value::Bool(false)]), Value::Bool(false));
        assert_eq!(apply(Op::LShift, &[Value::Int(1), Value::Int(3)]), Value::Int(8));
        assert_eq!(apply(Op::RShift, &[Value::Int(-8), Value::Int(1)]), Value::Int(-4));
        assert!(Op::LShift.apply(&[Value::Int(1), Value::Int(-1)]).is_err());
    }

    #[test]
    fn test_get_item() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(apply(Op::GetItem, &[list.clone(), Value::Int(-1)]), Value::Int(3));
        assert!(matches!(
            Op::GetItem.apply(&[list, Value::Int(3)]),
            Err(GraphError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(apply(Op::GetItem, &[Value::str("hey"), Value::Int(1)]), Value::str("e"));

        let map = Value::Map(Mapping::from_entries(MappingKind::Dict, [(Value::str("a"), Value::Int(1))]));
        assert_eq!(apply(Op::GetItem, &[map.clone(), Value::str("a")]), Value::Int(1));
        assert!(matches!(
            Op::GetItem.apply(&[map, Value::str("b")]),
            Err(GraphError::KeyNotFound { .. })
        ));
    }
}

#[cfg(test)]
mod callable_tests {
    use super::*;

    #[test]
    fn test_op_signatures() {
        assert_eq!(Op::Add.signature().params(), ["a", "b"]);
        assert_eq!(Op::Neg.signature().params(), ["a"]);
        assert_eq!(Op::GetItem.signature().params(), ["obj", "index"]);
        let pow = Op::Pow.signature();
        assert_eq!(pow.params(), ["base", "exp", "modulo"]);
        assert_eq!(pow.default_for("modulo"), Some(&Value::None));
    }

    #[test]
    fn test_function_without_signature_accepts_anything() {
        let f = Function::variadic("f", |_, _| Ok(Value::None));
        let sig = Callable::from(f).signature();
        assert!(sig.params().is_empty());
        assert_eq!(sig.varargs(), Some("args"));
        assert_eq!(sig.varkw(), Some("kwargs"));
    }

    #[test]
    fn test_function_equality_is_identity() {
        let f = Function::new("f", Signature::new(["x"]), |args, _| Ok(args[0].clone()));
        let g = Function::new("f", Signature::new(["x"]), |args, _| Ok(args[0].clone()));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }

    #[test]
    fn test_function_error_passes_through() {
        let f = Function::variadic("boom", |_, _| anyhow::bail!("boom"));
        let err = f.call(&[], &IndexMap::new()).unwrap_err();
        assert!(matches!(err, GraphError::Function(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_op_rejects_keywords() {
        let mut kwargs = IndexMap::new();
        kwargs.insert("b".to_string(), Value::Int(1));
        let err = Callable::Op(Op::Add).invoke(&[Value::Int(1)], &kwargs).unwrap_err();
        assert!(matches!(err, GraphError::Operation { op: "add", .. }));
    }
}

#[cfg(test)]
mod builtin_tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(call("int", &[Value::str(" 42 ")]), Value::Int(42));
        assert_eq!(call("int", &[Value::Float(-2.7)]), Value::Int(-2));
        assert_eq!(call("float", &[Value::str("2.5")]), Value::Float(2.5));
        assert_eq!(call("str", &[Value::Float(3.0)]), Value::str("3.0"));
        assert_eq!(call("bool", &[Value::Int(0)]), Value::Bool(false));
        assert_eq!(call("len", &[Value::List(vec![Value::None; 3])]), Value::Int(3));
        assert!(builtin("int").unwrap().call(&[Value::str("x")], &IndexMap::new()).is_err());
    }

    #[test]
    fn test_round_is_half_even() {
        assert_eq!(call("round", &[Value::Float(2.5)]), Value::Int(2));
        assert_eq!(call("round", &[Value::Float(3.5)]), Value::Int(4));
        assert_eq!(call("round", &[Value::Float(1.25), Value::Int(1)]), Value::Float(1.2));
    }

    #[test]
    fn test_round_rejects_non_finite() {
        let round = builtin("round").unwrap();
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            assert!(round.call(&[Value::Float(f)], &IndexMap::new()).is_err(), "round({})", f);
        }
        assert!(builtin("int").unwrap().call(&[Value::Float(f64::NAN)], &IndexMap::new()).is_err());
        assert_eq!(call("round", &[Value::Float(f64::INFINITY), Value::Int(2)]), Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_round_with_extreme_digits() {
        assert_eq!(call("round", &[Value::Float(1.5), Value::Int(i64::MAX)]), Value::Float(1.5));
        assert_eq!(call("round", &[Value::Float(123.0), Value::Int(1 << 40)]), Value::Float(123.0));
        assert_eq!(call("round", &[Value::Float(123.0), Value::Int(-(1 << 40))]), Value::Float(0.0));
        assert_eq!(call("round", &[Value::Float(1234.0), Value::Int(-2)]), Value::Float(1200.0));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(call("min", &[Value::Int(3), Value::Int(1), Value::Int(2)]), Value::Int(1));
        let items = Value::List(vec![Value::Int(1), Value::Int(5), Value::Int(2)]);
        assert_eq!(call("max", &[items]), Value::Int(5));
        assert!(builtin("max").unwrap().call(&[Value::List(vec![])], &IndexMap::new()).is_err());
    }

    #[test]
    fn test_registry_lookup() {
        assert_eq!(builtin("len"), builtin("len"));
        assert!(builtin("nope").is_none());
        let mut names: Vec<_> = BUILTINS.names().collect();
        names.sort_unstable();
        assert_eq!(names, ["abs", "bool", "float", "int", "len", "max", "min", "round", "str"]);
    }
}
